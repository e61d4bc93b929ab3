// Profile type tokens: a numeric index or one of the three labels.

use portal_api::ProfileType;

use crate::error::CoreError;

/// Parse a profile type token (`0`/`1`/`2` or
/// `development`/`adhoc`/`appstore`).
pub fn profile_type(token: &str) -> Result<ProfileType, CoreError> {
    ProfileType::from_token(token).ok_or_else(|| {
        CoreError::invalid(format!(
            "unknown profile type '{token}' (expected 0-2, development, adhoc or appstore)"
        ))
    })
}

/// Label for a profile type token.
pub fn profile_type_name(token: &str) -> Result<&'static str, CoreError> {
    profile_type(token).map(ProfileType::label)
}

/// Profile type for a numeric index.
pub fn profile_type_at(index: usize) -> Result<ProfileType, CoreError> {
    ProfileType::from_index(index)
        .ok_or_else(|| CoreError::invalid(format!("profile type {index} out of range (0-2)")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for index in 0..3_usize {
            let name = profile_type_name(&index.to_string()).unwrap();
            assert_eq!(profile_type(name).unwrap().index(), index);
        }
    }

    #[test]
    fn out_of_range_is_invalid() {
        assert!(matches!(
            profile_type_name("3"),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            profile_type("Development"),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(profile_type_at(7).is_err());
        assert_eq!(profile_type_at(2).unwrap(), ProfileType::AppStore);
    }
}
