use log::debug;

use crate::error::{LinkError, LoaderError};
use crate::executable::Executable;
use crate::image::ProgramImage;
use crate::loader::load_from_bytes;
use crate::unit::ReifiedUnit;

/// Turns compiled bytes into an [`Executable`].
pub trait ReifyBackend {
    fn reify(&mut self, bytes: &[u8], size_hint: usize) -> Result<Executable, LoaderError>;
}

impl<F> ReifyBackend for F
where
    F: FnMut(&[u8], usize) -> Result<Executable, LoaderError>,
{
    fn reify(&mut self, bytes: &[u8], size_hint: usize) -> Result<Executable, LoaderError> {
        self(bytes, size_hint)
    }
}

/// The default backend: decodes the `.qbc` format.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytecodeBackend;

impl ReifyBackend for BytecodeBackend {
    fn reify(&mut self, bytes: &[u8], size_hint: usize) -> Result<Executable, LoaderError> {
        let exe = load_from_bytes(bytes)?;
        if exe.instruction_count() != size_hint {
            debug!(
                "size hint {} does not match {} decoded instructions",
                size_hint,
                exe.instruction_count()
            );
        }
        Ok(exe)
    }
}

enum ReifierState {
    NoBackend,
    BackendInstalled(Box<dyn ReifyBackend>),
}

/// Links freshly compiled units into the live image.
///
/// Until a backend is installed every `reify` fails with
/// `ToplevelNotInitialized`. Installing again replaces the backend.
pub struct Reifier {
    image: ProgramImage,
    state: ReifierState,
}

impl Reifier {
    pub fn new(image: ProgramImage) -> Self {
        Self {
            image,
            state: ReifierState::NoBackend,
        }
    }

    pub fn install_backend(&mut self, backend: impl ReifyBackend + 'static) {
        debug!("reification backend installed");
        self.state = ReifierState::BackendInstalled(Box::new(backend));
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, ReifierState::BackendInstalled(_))
    }

    pub fn image(&self) -> &ProgramImage {
        &self.image
    }

    /// Hand `bytes` to the backend once and bind the result to the image.
    pub fn reify(&mut self, bytes: &[u8], size_hint: usize) -> Result<ReifiedUnit, LinkError> {
        let ReifierState::BackendInstalled(backend) = &mut self.state else {
            return Err(LinkError::ToplevelNotInitialized);
        };
        debug!("reify {} bytes (size hint {})", bytes.len(), size_hint);
        let exe = backend
            .reify(bytes, size_hint)
            .map_err(|e| LinkError::MalformedUnit(e.to_string()))?;
        ReifiedUnit::bind(exe, &self.image, size_hint)
    }

    /// Release a unit. Nothing is held outside the shared heap, so this
    /// always succeeds.
    pub fn release_reified(&mut self, unit: ReifiedUnit) -> Result<(), LinkError> {
        debug!("released unit (main fn #{})", unit.main_function());
        drop(unit);
        Ok(())
    }
}

impl std::fmt::Debug for Reifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reifier")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
