//! Size-reduction pass

use crate::error::Result;
use crate::pages;
use tracing::debug;

/// Output of a compression pass with the sizes needed to judge it.
#[derive(Debug)]
pub struct CompressionReport {
    pub bytes: Vec<u8>,
    pub original_size: usize,
}

impl CompressionReport {
    pub fn output_size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the pass actually produced a smaller file.
    pub fn reduced(&self) -> bool {
        self.output_size() < self.original_size
    }
}

/// Re-serialize a PDF with lopdf's size-reduction passes.
///
/// Drops unreachable objects and empty streams, renumbers what is left,
/// and Flate-compresses uncompressed streams. Nothing guarantees the
/// result is smaller; check [`CompressionReport::reduced`].
pub fn compress_document(bytes: &[u8]) -> Result<CompressionReport> {
    let mut doc = pages::load(bytes)?;

    let pruned = doc.prune_objects();
    let emptied = doc.delete_zero_length_streams();
    doc.renumber_objects();
    doc.compress();

    let output = pages::save(&mut doc)?;
    debug!(
        pruned = pruned.len(),
        empty_streams = emptied.len(),
        before = bytes.len(),
        after = output.len(),
        "compressed document"
    );

    Ok(CompressionReport {
        bytes: output,
        original_size: bytes.len(),
    })
}
