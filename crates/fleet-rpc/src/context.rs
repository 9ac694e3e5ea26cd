use crate::proto::Context;
use fleet_model::FleetError;

/// Location-enforcement helper for [`Context`], §4.8: every read/write must
/// filter by `Context.location`; a call referencing a resource outside it
/// fails with a conflict rather than leaking cross-location data.
pub trait ContextExt {
    fn require_location(&self, resource_location: &str) -> Result<(), FleetError>;
}

impl ContextExt for Context {
    fn require_location(&self, resource_location: &str) -> Result<(), FleetError> {
        if self.location != resource_location {
            return Err(FleetError::conflict(format!(
                "context location {} does not match resource location {resource_location}",
                self.location
            )));
        }
        Ok(())
    }
}

impl Context {
    pub fn new(reply_to: impl Into<String>, user: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            reply_to: reply_to.into(),
            user: user.into(),
            location: location.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_location_rejects_mismatch() {
        let ctx = Context::new("ops@example.com", "alice", "dc1");
        assert!(ctx.require_location("dc1").is_ok());
        assert!(ctx.require_location("dc2").is_err());
    }
}
