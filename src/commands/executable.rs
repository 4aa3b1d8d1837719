use crate::frame::Frame;
use crate::store::InnerStoreLocked;
use crate::Error;

/// A parsed command that can run against the locked keyspace.
pub trait Executable {
    fn exec(self, store: &mut InnerStoreLocked) -> Result<Frame, Error>;
}
