use chrono::NaiveDate;

/// Optional date-range and sort modifiers applied to read and aggregate
/// queries. Built fresh per query; never persisted.
///
/// The date bounds are inclusive and only take effect when [`date_field`]
/// names the column they constrain — bounds without a field are ignored.
///
/// [`date_field`]: Self::on_field
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RowFilter {
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    pub date_field: Option<String>,
    pub sort_by: Option<String>,
    pub sort_desc: bool,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.earliest = Some(date);
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.latest = Some(date);
        self
    }

    /// Name the column the date bounds apply to.
    pub fn on_field(mut self, column: impl Into<String>) -> Self {
        self.date_field = Some(column.into());
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.sort_desc = true;
        self
    }
}
