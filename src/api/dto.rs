use serde::{Deserialize, Serialize};

/// Body for `POST /user` and `PUT /user/{id}`.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub age: i32,
}

/// Query parameters for `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub start: Option<i64>,
    pub count: Option<i64>,
}

impl ListQuery {
    /// Page size is clamped to `1..=10` (anything else falls back to 10) and
    /// the offset floors at zero, so a hostile query string can never turn
    /// into an unbounded scan.
    pub fn bounds(&self) -> (i64, i64) {
        let mut count = self.count.unwrap_or(10);
        if !(1..=10).contains(&count) {
            count = 10;
        }
        let start = self.start.unwrap_or(0).max(0);
        (start, count)
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub result: String,
}

impl DeleteResponse {
    pub fn success() -> Self {
        Self { result: "success".to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_defaults() {
        let query = ListQuery::default();
        assert_eq!(query.bounds(), (0, 10));
    }

    #[test]
    fn test_bounds_clamps_oversized_count() {
        let query = ListQuery { start: Some(5), count: Some(50) };
        assert_eq!(query.bounds(), (5, 10));
    }

    #[test]
    fn test_bounds_clamps_nonpositive_count() {
        let query = ListQuery { start: Some(0), count: Some(0) };
        assert_eq!(query.bounds(), (0, 10));
    }

    #[test]
    fn test_bounds_floors_negative_start() {
        let query = ListQuery { start: Some(-3), count: Some(4) };
        assert_eq!(query.bounds(), (0, 4));
    }

    #[test]
    fn test_bounds_passes_valid_values_through() {
        let query = ListQuery { start: Some(20), count: Some(7) };
        assert_eq!(query.bounds(), (20, 7));
    }
}
