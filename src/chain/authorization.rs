use std::{collections::HashMap, sync::Arc};

use flexlink_error::{BrokerError, FlexResult, StackError};

use super::{Next, Stage};
use crate::{error::report, Request, Response};

/// Role-based access to destinations.
///
/// A destination without rules is open. A protected destination needs a
/// principal holding at least one of its roles.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationStage {
    rules: HashMap<Arc<str>, Vec<String>>,
}

impl AuthorizationStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protects `destination`. Repeated calls extend the accepted roles.
    pub fn require(
        mut self,
        destination: impl Into<Arc<str>>,
        roles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.rules
            .entry(destination.into())
            .or_default()
            .extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn is_protected(
        &self,
        destination: &str,
    ) -> bool {
        self.rules.contains_key(destination)
    }

    fn check(
        &self,
        request: &Request,
    ) -> Result<(), BrokerError> {
        let Some(roles) = self.rules.get(&*request.destination) else {
            return Ok(());
        };

        let Some(principal) = &request.principal else {
            return Err(BrokerError::Unauthorized {
                destination: request.destination.to_string(),
            });
        };

        if roles.iter().any(|role| principal.has_role(role)) {
            Ok(())
        } else {
            Err(BrokerError::PermissionDenied {
                destination: request.destination.to_string(),
                principal: principal.name.clone(),
            })
        }
    }
}

impl Stage for AuthorizationStage {
    fn handle(
        &self,
        request: Request,
        next: Next<'_>,
    ) -> FlexResult<Response> {
        if let Err(e) = self.check(&request) {
            let error = StackError::new(e);
            let _span = tracing::info_span!(
                "authorize",
                client_id = %request.client_id,
                operation = request.body.kind()
            )
            .entered();
            report(&error, "request denied");
            return Err(error);
        }
        next.run(request)
    }
}

#[cfg(test)]
mod tests {
    use flexlink_error::StatusCode;

    use super::*;
    use crate::{
        chain::{Chain, Endpoint},
        Principal,
    };

    struct Ack;

    impl Endpoint for Ack {
        fn dispatch(
            &self,
            _request: Request,
        ) -> FlexResult<Response> {
            Ok(Response::Ack)
        }
    }

    fn chain() -> Chain {
        Chain::new().with(
            AuthorizationStage::new()
                .require("orders", ["trader"])
                .require("orders", ["ops"]),
        )
    }

    #[test]
    fn test_open_destination_needs_no_principal() {
        let response = chain()
            .execute(Request::subscribe("c", "quotes"), &Ack)
            .unwrap();
        assert_eq!(response, Response::Ack);
    }

    #[test]
    fn test_anonymous_request_is_unauthorized() {
        let err = chain()
            .execute(Request::subscribe("c", "orders"), &Ack)
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::Unauthorized);
    }

    #[test]
    fn test_missing_role_is_denied() {
        let request =
            Request::subscribe("c", "orders").with_principal(Principal::new("bob", ["viewer"]));
        let err = chain().execute(request, &Ack).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::PermissionDenied);
        assert!(!err.client_message().contains("bob"));
    }

    #[test]
    fn test_any_accepted_role_passes() {
        let request =
            Request::subscribe("c", "orders").with_principal(Principal::new("eve", ["ops"]));
        assert_eq!(chain().execute(request, &Ack).unwrap(), Response::Ack);
    }

    #[test]
    fn test_is_protected() {
        let stage = AuthorizationStage::new().require("orders", ["trader"]);
        assert!(stage.is_protected("orders"));
        assert!(!stage.is_protected("quotes"));
    }
}
