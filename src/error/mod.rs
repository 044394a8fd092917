pub mod channel;
pub mod report;

pub use channel::{RecvError, TryRecvError};
pub use flexlink_error::{
    bail, BrokerError, ErrorExt, FlexResult, GenericError, LifecycleError, ResourceError,
    ResultExt, StackError, StatusCode, Transition,
};
pub use report::report;
