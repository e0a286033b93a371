//! Client actions deciding continuation and publication.
//!
//! One action governs a whole run. [`ClientAction::Publish`] keeps pulling
//! requests from the transport and publishes every response;
//! [`ClientAction::Stop`] ends the run before the first receive and never
//! publishes or acknowledges anything.

use std::time::Duration;

use callq_config::ActionMode;

use crate::envelope::{Request, Response};
use crate::transport::{Transport, TransportError};

/// Audit suffix recorded for responses that were not published.
pub const NOT_PUBLISHED: &str = "(NOT PUBLISHED)";

/// Policy applied after every dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientAction {
    /// Keep consuming and publish every response.
    #[default]
    Publish,
    /// Consume nothing further and publish nothing.
    Stop,
}

impl ClientAction {
    /// Audit fragment describing what happened to the response.
    #[must_use]
    pub const fn audit_text(self) -> &'static str {
        match self {
            Self::Publish => "",
            Self::Stop => NOT_PUBLISHED,
        }
    }

    /// Fetches the next request, or `None` when the run should end.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`] from the transport's receive.
    pub fn next_request<T>(
        self,
        transport: &mut T,
        timeout: Duration,
    ) -> Result<Option<Request>, TransportError>
    where
        T: Transport + ?Sized,
    {
        match self {
            Self::Publish => transport.receive(timeout),
            Self::Stop => Ok(None),
        }
    }

    /// Publishes and acknowledges, or drops the response unpublished.
    ///
    /// Under [`ClientAction::Stop`] the request is dropped without
    /// acknowledgment, leaving the message for redelivery.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`] from the transport's respond.
    pub fn after_response<T>(
        self,
        transport: &mut T,
        request: Request,
        response: &Response,
    ) -> Result<(), TransportError>
    where
        T: Transport + ?Sized,
    {
        match self {
            Self::Publish => transport.respond(request, response),
            Self::Stop => Ok(()),
        }
    }
}

impl From<ActionMode> for ClientAction {
    fn from(mode: ActionMode) -> Self {
        match mode {
            ActionMode::Publish => Self::Publish,
            ActionMode::Stop => Self::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::envelope::DeliveryHandle;
    use crate::tests::support::MockTransport;

    const TIMEOUT: Duration = Duration::from_millis(10);

    fn request(id: &str) -> Request {
        Request::new(id, "add", Vec::new(), DeliveryHandle::new(id))
    }

    #[rstest]
    #[case(ClientAction::Publish, "")]
    #[case(ClientAction::Stop, "(NOT PUBLISHED)")]
    fn exposes_audit_text(#[case] action: ClientAction, #[case] expected: &str) {
        assert_eq!(action.audit_text(), expected);
    }

    #[rstest]
    #[case(ActionMode::Publish, ClientAction::Publish)]
    #[case(ActionMode::Stop, ClientAction::Stop)]
    fn maps_configured_mode(#[case] mode: ActionMode, #[case] expected: ClientAction) {
        assert_eq!(ClientAction::from(mode), expected);
    }

    #[test]
    fn publish_delegates_receive() {
        let mut transport = MockTransport::new();
        transport
            .expect_receive()
            .withf(|timeout| *timeout == TIMEOUT)
            .times(1)
            .return_once(|_| Ok(Some(request("X1"))));

        let next = ClientAction::Publish
            .next_request(&mut transport, TIMEOUT)
            .expect("receive succeeds")
            .expect("request available");
        assert_eq!(next.id(), "X1");
    }

    #[test]
    fn stop_never_receives() {
        let mut transport = MockTransport::new();
        transport.expect_receive().never();

        let next = ClientAction::Stop
            .next_request(&mut transport, TIMEOUT)
            .expect("stop never fails");
        assert!(next.is_none());
    }

    #[test]
    fn publish_responds_with_request_and_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_respond()
            .withf(|request, response| request.id() == "X1" && response.id() == "X1")
            .times(1)
            .returning(|_, _| Ok(()));

        ClientAction::Publish
            .after_response(
                &mut transport,
                request("X1"),
                &Response::success("X1", json!(5)),
            )
            .expect("respond succeeds");
    }

    #[test]
    fn stop_never_responds() {
        let mut transport = MockTransport::new();
        transport.expect_respond().never();

        ClientAction::Stop
            .after_response(
                &mut transport,
                request("X1"),
                &Response::success("X1", json!(5)),
            )
            .expect("stop never fails");
    }
}
