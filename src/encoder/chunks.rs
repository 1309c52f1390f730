//! Strip and tile enumeration, sequential or fanned out over a thread pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock, PoisonError};

use enough::{Stop, StopReason};

use super::pipeline::{ChunkOutput, ChunkResult, ChunkSource, EncodeContext, EncodePipeline};
use crate::decoder::ChunkLayout;
use crate::pixel::{Region, Size};
use crate::pool::ScratchPool;
use crate::tags::{ByteOrder, PhotometricInterpretation};
use crate::{TiffError, TiffResult, UsageError};

/// The chunks an image is cut into, in raster order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkGrid {
    layout: ChunkLayout,
    image: Size,
}

impl ChunkGrid {
    /// Tiles must be a non-zero multiple of 16 in both directions, strips at least one row.
    pub fn new(layout: ChunkLayout, image: Size) -> TiffResult<Self> {
        match layout {
            ChunkLayout::Tiles { width, height } => {
                if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
                    return Err(UsageError::InvalidTileSize { width, height }.into());
                }
            }
            ChunkLayout::Strips { rows_per_strip } => {
                if rows_per_strip == 0 {
                    return Err(UsageError::InvalidRowsPerStrip(rows_per_strip).into());
                }
            }
        }
        Ok(ChunkGrid { layout, image })
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    /// Chunks across and down.
    pub fn dimensions(&self) -> (u32, u32) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                (1, self.image.height.div_ceil(rows_per_strip))
            }
            ChunkLayout::Tiles { width, height } => (
                self.image.width.div_ceil(width),
                self.image.height.div_ceil(height),
            ),
        }
    }

    pub fn len(&self) -> usize {
        let (across, down) = self.dimensions();
        across as usize * down as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pixels of the image covered by chunk `index`.
    pub fn region(&self, index: usize) -> Region {
        let (across, _) = self.dimensions();
        let (w, h) = match self.layout {
            ChunkLayout::Strips { rows_per_strip } => (self.image.width, rows_per_strip),
            ChunkLayout::Tiles { width, height } => (width, height),
        };
        let x = (index % across as usize) as u32 * w;
        let y = (index / across as usize) as u32 * h;
        Region::new(
            x,
            y,
            w.min(self.image.width - x),
            h.min(self.image.height - y),
        )
    }

    /// Stored size of chunk `index`. Tiles are always full size, the last strip is cut.
    pub fn stored_size(&self, index: usize) -> Size {
        match self.layout {
            ChunkLayout::Strips { .. } => self.region(index).size,
            ChunkLayout::Tiles { width, height } => Size::new(width, height),
        }
    }
}

/// A worker pool that encodes independent chunks concurrently.
///
/// Every dispatch blocks until all of its chunks are done; the table of results is indexed by
/// chunk position so completion order does not matter.
#[derive(Debug)]
pub struct ParallelEncodingState {
    pool: rayon::ThreadPool,
}

impl ParallelEncodingState {
    /// A pool with `threads` workers, or rayon's default when zero.
    pub fn new(threads: usize) -> TiffResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tiff-encode-{}", i))
            .build()
            .map_err(|err| UsageError::ThreadPool(err.to_string()))?;
        Ok(ParallelEncodingState { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `task` once per index and return when every task has finished.
    fn dispatch<F>(&self, count: usize, task: F)
    where
        F: Fn(usize) + Sync,
    {
        let task = &task;
        self.pool.scope(|scope| {
            for index in 0..count {
                scope.spawn(move |_| task(index));
            }
        });
    }
}

/// Facts shared by every chunk of one image.
#[derive(Clone, Copy)]
pub(crate) struct ChunkShared<'a> {
    pub bits_per_sample: &'a [u16],
    pub photometric: PhotometricInterpretation,
    pub byte_order: ByteOrder,
    pub source: &'a dyn ChunkSource,
    pub output: &'a dyn ChunkOutput,
    pub pool: &'a ScratchPool<u8>,
    pub stop: &'a (dyn Stop + Sync),
}

fn encode_one(
    grid: &ChunkGrid,
    pipeline: &EncodePipeline<'_>,
    shared: ChunkShared<'_>,
    index: usize,
) -> TiffResult<ChunkResult> {
    let mut ctx = EncodeContext {
        index,
        region: grid.region(index),
        stored: grid.stored_size(index),
        bits_per_sample: shared.bits_per_sample,
        photometric: shared.photometric,
        byte_order: shared.byte_order,
        source: shared.source,
        output: shared.output,
        pool: shared.pool,
        data: Vec::new(),
        written: None,
        stop: shared.stop,
    };
    pipeline.run(&mut ctx)?;
    ctx.written
        .ok_or(TiffError::Cancelled(StopReason::Cancelled))
}

/// Encode every chunk of `grid` and return their positions in raster order.
pub(crate) fn encode_chunks(
    grid: &ChunkGrid,
    pipeline: &EncodePipeline<'_>,
    shared: ChunkShared<'_>,
    parallel: Option<&ParallelEncodingState>,
) -> TiffResult<Vec<ChunkResult>> {
    let Some(parallel) = parallel else {
        return (0..grid.len())
            .map(|index| {
                shared.stop.check()?;
                encode_one(grid, pipeline, shared, index)
            })
            .collect();
    };

    let slots: Vec<OnceLock<ChunkResult>> = (0..grid.len()).map(|_| OnceLock::new()).collect();
    let failed = AtomicBool::new(false);
    let first_error = Mutex::new(None);

    log::trace!(
        "dispatching {} chunks to {} threads",
        grid.len(),
        parallel.threads()
    );
    parallel.dispatch(grid.len(), |index| {
        if failed.load(Ordering::Acquire) {
            return;
        }
        let result = shared
            .stop
            .check()
            .map_err(TiffError::from)
            .and_then(|()| encode_one(grid, pipeline, shared, index));
        match result {
            Ok(written) => {
                let _ = slots[index].set(written);
                log::trace!("chunk {} done", index);
            }
            Err(err) => {
                failed.store(true, Ordering::Release);
                first_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(err);
            }
        }
    });

    if let Some(err) = first_error
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
    {
        return Err(err);
    }
    slots
        .into_iter()
        .map(OnceLock::into_inner)
        .collect::<Option<Vec<_>>>()
        .ok_or(TiffError::Cancelled(StopReason::Cancelled))
}
