//! # Local Service Ledger
//!
//! Recurring bills kept in local storage, outside the record store. Entries
//! have no id: they are addressed by position in the list.
//!
//! The list is read once when the ledger is loaded and rewritten in full after
//! every change. A change only becomes visible in memory once it has been
//! persisted.
//!
//! Paying a service touches both stores: the expense is written to the record
//! store first, and only once that write succeeds is the entry removed
//! locally. A failed remote write leaves the list exactly as it was.

use crate::commands::helpers::{format_date, reference_token, to_fields, WriteSteps};
use crate::commands::{CmdMessage, CmdResult};
use crate::error::{LedgerError, Result};
use crate::model::{now_iso, Collection, MoneyRecord, MoneyType, Service};
use crate::store::local::{LocalStorage, SERVICES_KEY};
use crate::store::DataStore;
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ServiceSummary {
    pub count: usize,
    pub total_amount: f64,
    pub overdue_count: usize,
}

pub struct ServiceLedger<L: LocalStorage> {
    local: L,
    services: Vec<Service>,
}

fn decode_services(raw: &str) -> Vec<Service> {
    let entries: Vec<Value> = match serde_json::from_str(raw) {
        Ok(Value::Array(entries)) => entries,
        Ok(_) | Err(_) => {
            warn!("stored service list is not a JSON array, starting empty");
            return Vec::new();
        }
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<Service>(entry) {
            Ok(service) => Some(service),
            Err(err) => {
                warn!(error = %err, "skipping unreadable service entry");
                None
            }
        })
        .collect()
}

impl<L: LocalStorage> ServiceLedger<L> {
    pub fn load(local: L) -> Result<Self> {
        let services = local
            .get_item(SERVICES_KEY)?
            .map(|raw| decode_services(&raw))
            .unwrap_or_default();
        Ok(Self { local, services })
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn get(&self, index: usize) -> Result<&Service> {
        self.services.get(index).ok_or_else(|| {
            LedgerError::Validation(format!(
                "No service at position {} ({} listed)",
                index + 1,
                self.services.len()
            ))
        })
    }

    fn persist(&self, services: &[Service]) -> Result<()> {
        let raw = serde_json::to_string(services)?;
        self.local.set_item(SERVICES_KEY, &raw)
    }

    pub fn add(&mut self, service: Service) -> Result<CmdResult> {
        let name = service.name.trim().to_string();
        if name.is_empty() {
            return Err(LedgerError::Validation(
                "Service name cannot be empty".to_string(),
            ));
        }
        if !service.amount.is_finite() || service.amount < 0.0 {
            return Err(LedgerError::Validation(
                "Amount must be a non-negative number".to_string(),
            ));
        }

        let mut next = self.services.clone();
        next.push(Service { name, ..service });
        self.persist(&next)?;
        self.services = next;
        info!(count = self.services.len(), "service added");

        let mut result = CmdResult::default();
        result.add_message(CmdMessage::success("Service added"));
        Ok(result)
    }

    /// Books the bill as an expense dated `today`, then drops it from the list.
    pub fn pay<S: DataStore>(
        &mut self,
        index: usize,
        store: &S,
        today: NaiveDate,
    ) -> Result<CmdResult> {
        let service = self.get(index)?.clone();
        let expense = MoneyRecord {
            id: String::new(),
            money_type: Some(MoneyType::Salida),
            amount: Some(service.amount),
            description: format!("Pago de servicio: {}", service.name),
            reference: Some(format!("Servicio-{}", reference_token())),
            date: Some(format_date(today)),
            created_at: Some(now_iso()),
        };

        let mut steps = WriteSteps::new();
        let money_id = steps.run("create expense record", || {
            store.push(Collection::Money, &to_fields(&expense)?)
        })?;

        let mut next = self.services.clone();
        next.remove(index);
        steps.run("remove paid service", || self.persist(&next))?;
        self.services = next;
        info!(name = %service.name, amount = service.amount, "service paid");

        let mut result = CmdResult::default().with_affected_ids(vec![money_id]);
        result.add_message(CmdMessage::success(format!(
            "Service paid: {}",
            service.name
        )));
        Ok(result)
    }

    pub fn remove(&mut self, index: usize) -> Result<CmdResult> {
        let service = self.get(index)?.clone();
        let mut next = self.services.clone();
        next.remove(index);
        self.persist(&next)?;
        self.services = next;
        info!(name = %service.name, "service removed");

        let mut result = CmdResult::default();
        result.add_message(CmdMessage::success(format!(
            "Service removed: {}",
            service.name
        )));
        Ok(result)
    }

    /// Drops the whole list from local storage.
    pub fn clear(&mut self) -> Result<()> {
        self.local.remove_item(SERVICES_KEY)?;
        self.services.clear();
        Ok(())
    }

    pub fn summary(&self, today: NaiveDate) -> ServiceSummary {
        ServiceSummary {
            count: self.services.len(),
            total_amount: self
                .services
                .iter()
                .map(|s| s.amount)
                .filter(|a| a.is_finite())
                .sum(),
            overdue_count: self.services.iter().filter(|s| s.is_overdue(today)).count(),
        }
    }
}
