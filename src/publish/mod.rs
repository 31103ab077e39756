//! Camera pose publication for downstream consumers.

pub mod messages;
pub mod pose_publisher;

pub use messages::{
    Header, Pose, PoseStamped, PoseUpdate, PoseWithCovarianceStamped, TransformStamped,
};
pub use pose_publisher::{
    ChannelSink, PosePublisher, PosePublisherConfig, PoseSink, compose_update,
};
