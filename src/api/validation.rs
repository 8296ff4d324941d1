use super::ApiError;

pub fn validate_user_id(id: i32) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(id)
}

/// Form semantics carried over from the old console: a day count of zero or
/// less means "no expiry requested".
pub fn normalize_days_to_expire(days: Option<i64>) -> Option<i64> {
    days.filter(|d| *d > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_user_id() {
        assert!(validate_user_id(1).is_ok());
        assert!(validate_user_id(12345).is_ok());
        assert!(validate_user_id(0).is_err());
        assert!(validate_user_id(-1).is_err());
    }

    #[test]
    fn test_normalize_days_to_expire() {
        assert_eq!(normalize_days_to_expire(Some(30)), Some(30));
        assert_eq!(normalize_days_to_expire(Some(1)), Some(1));
        assert_eq!(normalize_days_to_expire(Some(0)), None);
        assert_eq!(normalize_days_to_expire(Some(-7)), None);
        assert_eq!(normalize_days_to_expire(None), None);
    }
}
