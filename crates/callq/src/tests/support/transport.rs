//! `mockall` double for the transport port.

use std::time::Duration;

use mockall::mock;

use crate::envelope::{Request, Response};
use crate::transport::{Transport, TransportError};

mock! {
    pub Transport {}
    impl Transport for Transport {
        fn receive(&mut self, timeout: Duration) -> Result<Option<Request>, TransportError>;
        fn respond(&mut self, request: Request, response: &Response) -> Result<(), TransportError>;
    }
}
