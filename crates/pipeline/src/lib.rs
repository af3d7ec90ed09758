//! The SmartBin deposit pipeline and the services around it.

pub mod assistant;
pub mod capture;
mod error;
pub mod location;
pub mod persist;
pub mod pipeline;
pub mod session;
pub mod sink;

pub use assistant::{Assistant, ChatReply};
pub use capture::{
    CameraCapture, CaptureSession, CaptureSource, DeviceOpener, FileCapture, Frame, FrameDevice,
};
pub use error::{CaptureError, PersistError, PipelineError};
pub use location::{Coordinates, FixedLocation, LocationProvider, LocationRequest};
pub use persist::{PersistenceAdapter, UploadMetadata, DEFAULT_BUCKET};
pub use pipeline::{DepositPipeline, DepositReport};
pub use session::{Session, SessionError, SessionStore};
pub use sink::{CollectingSink, Notification, ResultSink, Severity, SinkEvent, TracingSink};
