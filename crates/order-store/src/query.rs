use chrono::NaiveDate;

use crate::CustomerId;

/// Builder for filtering stored orders.
///
/// Results are ordered by order number (year, then sequence).
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    /// Filter by delivery date.
    pub delivery_date: Option<NaiveDate>,

    /// Filter by status tokens (any of these).
    pub statuses: Option<Vec<String>>,

    /// Filter by customer.
    pub customer_id: Option<CustomerId>,

    /// Maximum number of orders to return.
    pub limit: Option<usize>,

    /// Number of orders to skip.
    pub offset: Option<usize>,
}

impl OrderQuery {
    /// Creates a new empty query matching every order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for orders delivered on `date`.
    pub fn for_delivery_date(date: NaiveDate) -> Self {
        Self {
            delivery_date: Some(date),
            ..Default::default()
        }
    }

    /// Filters by delivery date.
    pub fn delivery_date(mut self, date: NaiveDate) -> Self {
        self.delivery_date = Some(date);
        self
    }

    /// Filters by any of the given status tokens.
    pub fn statuses<I, T>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.statuses = Some(statuses.into_iter().map(Into::into).collect());
        self
    }

    /// Filters by customer.
    pub fn customer_id(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    /// Limits the number of orders returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many orders before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if a record with these attributes passes every filter.
    pub fn matches(&self, delivery_date: NaiveDate, status: &str, customer_id: CustomerId) -> bool {
        if let Some(date) = self.delivery_date
            && date != delivery_date
        {
            return false;
        }
        if let Some(ref statuses) = self.statuses
            && !statuses.iter().any(|s| s == status)
        {
            return false;
        }
        if let Some(id) = self.customer_id
            && id != customer_id
        {
            return false;
        }
        true
    }
}
