use console::Style;
use once_cell::sync::Lazy;

/// Semantic styles for terminal output.
pub struct Styles {
    pub title: Style,
    pub heading: Style,
    pub income: Style,
    pub expense: Style,
    pub loss: Style,
    pub low_stock: Style,
    pub overdue: Style,
    pub id: Style,
    pub time: Style,
    pub info: Style,
    pub success: Style,
    pub warning: Style,
    pub error: Style,
}

pub static STYLES: Lazy<Styles> = Lazy::new(|| Styles {
    title: Style::new().bold().underlined(),
    heading: Style::new().bold(),
    income: Style::new().green(),
    expense: Style::new().red(),
    loss: Style::new().magenta(),
    low_stock: Style::new().yellow(),
    overdue: Style::new().red().bold(),
    id: Style::new().color256(245),
    time: Style::new().color256(246).italic(),
    info: Style::new().dim(),
    success: Style::new().green(),
    warning: Style::new().yellow(),
    error: Style::new().red(),
});
