//! Ownership of one codec handle plus its scratch regions.

use tracing::{debug, warn};

use crate::engine::{CodecEngine, SessionHandle};
use crate::error::{Error, Result};
use crate::scratch::{Sample, SessionScratch};

/// Native resources of one session.
///
/// Released exactly once, either by [`Session::release`] or on drop.
pub(crate) struct Session<E: CodecEngine, H: SessionHandle, P: Sample> {
    pub(crate) engine: E,
    pub(crate) handle: H,
    pub(crate) scratch: SessionScratch<P>,
    released: bool,
}

impl<E: CodecEngine, H: SessionHandle, P: Sample> Session<E, H, P> {
    /// Takes ownership of `handle` and allocates the scratch regions. If the
    /// allocation fails the handle is torn down before returning.
    pub(crate) fn open(mut engine: E, handle: H, stream_len: usize, pcm_len: usize) -> Result<Self> {
        match SessionScratch::alloc(&mut engine, stream_len, pcm_len) {
            Ok(scratch) => Ok(Self {
                engine,
                handle,
                scratch,
                released: false,
            }),
            Err(e) => {
                handle.teardown(&mut engine);
                Err(e)
            }
        }
    }

    /// Tears down the handle and frees the scratch regions. Later calls are
    /// no-ops.
    pub(crate) fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let status = self.handle.teardown(&mut self.engine);
        self.scratch.release(&mut self.engine);
        debug!("mp3: released {:?}", self.handle);

        if status < 0 {
            warn!("mp3: {} returned {}", H::TEARDOWN, status);
            return Err(Error::Teardown {
                op: H::TEARDOWN,
                status,
            });
        }
        Ok(())
    }
}

impl<E: CodecEngine, H: SessionHandle, P: Sample> Drop for Session<E, H, P> {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
