use crate::commands::helpers::WriteSteps;
use crate::commands::{CmdMessage, CmdResult};
use crate::confirm::Verified;
use crate::error::Result;
use crate::services::ServiceLedger;
use crate::store::local::LocalStorage;
use crate::store::DataStore;
use tracing::info;

/// Wipes the whole remote root, then the local service list.
///
/// Takes a [`Verified`] token: the caller must have passed the confirmation
/// challenge first.
pub fn run<S: DataStore, L: LocalStorage>(
    store: &S,
    ledger: &mut ServiceLedger<L>,
    _verified: Verified,
) -> Result<CmdResult> {
    let mut steps = WriteSteps::new();
    steps.run("remove all records", || store.remove_all())?;
    steps.run("clear services", || ledger.clear())?;
    info!("all data cleared");

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success("All data deleted"));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::model::Service;
    use crate::store::local::{MemLocal, SERVICES_KEY};
    use crate::store::memory::fixtures::StoreFixture;

    fn ledger() -> ServiceLedger<MemLocal> {
        let mut ledger = ServiceLedger::load(MemLocal::new()).unwrap();
        ledger.add(Service::new("Luz", 100.0, None)).unwrap();
        ledger
    }

    #[test]
    fn clears_both_stores() {
        let fixture = StoreFixture::new().with_product("Pan", 10, 5, 100.0);
        let mut ledger = ledger();

        run(&fixture.store, &mut ledger, Verified::for_tests()).unwrap();

        assert!(fixture.store.snapshot().unwrap().is_empty());
        assert!(ledger.services().is_empty());
        assert!(ledger.local().get_item(SERVICES_KEY).unwrap().is_none());
    }

    #[test]
    fn remote_failure_keeps_services() {
        let fixture = StoreFixture::new().with_product("Pan", 10, 5, 100.0);
        fixture.store.backend().set_simulate_write_error(true);
        let mut ledger = ledger();

        let err = run(&fixture.store, &mut ledger, Verified::for_tests()).unwrap_err();
        assert!(matches!(err, LedgerError::RemoteWrite(_)));
        assert_eq!(ledger.services().len(), 1);
        assert!(!fixture.store.snapshot().unwrap().is_empty());
    }
}
