//! Path validation.

use thiserror::Error;

/// Maximum allowed path depth.
pub const MAX_PATH_DEPTH: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("path is deeper than {MAX_PATH_DEPTH} steps")]
    PathTooDeep,
}

/// Validate a parsed path.
///
/// # Errors
///
/// Returns an error if the path has more than [`MAX_PATH_DEPTH`] steps.
///
/// # Example
///
/// ```
/// use json_observer_path::validate_path;
///
/// validate_path(&["a".to_string(), "b".to_string()]).unwrap();
/// validate_path(&(0..300).map(|i| i.to_string()).collect::<Vec<_>>()).unwrap_err();
/// ```
pub fn validate_path(path: &[String]) -> Result<(), ValidationError> {
    if path.len() > MAX_PATH_DEPTH {
        return Err(ValidationError::PathTooDeep);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_limit_is_inclusive() {
        let at_limit: Vec<String> = (0..MAX_PATH_DEPTH).map(|i| i.to_string()).collect();
        assert!(validate_path(&at_limit).is_ok());
        let over: Vec<String> = (0..=MAX_PATH_DEPTH).map(|i| i.to_string()).collect();
        assert_eq!(validate_path(&over), Err(ValidationError::PathTooDeep));
        assert!(validate_path(&[]).is_ok());
    }
}
