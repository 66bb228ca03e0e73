pub mod loader;
pub mod output;
pub mod scan;

use crate::error::ImageLoadError;

/// Minimum number of valid images a run needs, given how many supported files
/// the gate discovered. A directory that only ever held one image may pass it
/// through unchanged; a directory of several that degrades to one may not.
pub fn required_images(discovered: usize) -> usize {
    if discovered >= 2 {
        2
    } else {
        1
    }
}

pub(crate) fn ensure_enough_images(found: usize, discovered: usize) -> Result<(), ImageLoadError> {
    let required = required_images(discovered);
    if found < required {
        return Err(ImageLoadError::InsufficientImages { found, required });
    }
    Ok(())
}
