//! Turning a snapshot of the working set into an ordered list of pages.

use crate::image::{ImageId, ImageRecord};
use crate::layout::compute_display_size;
use crate::orientation::{DecisionCache, OrientationDecision};
use crate::pagesize::PageOrientation;
use crate::settings::LayoutSettings;
use crate::transform::{rotate_detached, Rotator};
use crate::units::Pt;
use futures::stream::{self, StreamExt};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reasons a document generation is refused
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateError {
    #[error("there are no images to put in the document")]
    EmptyWorkingSet,

    #[error("a document is already being generated")]
    AlreadyGenerating,

    #[error("the working set changed while the document was being generated")]
    Cancelled,
}

/// One finished page, ready to be handed to a document writer
#[derive(Clone, Debug, PartialEq)]
pub struct PageDescriptor {
    /// The image the page was made from
    pub source: ImageId,
    /// Encoded image data, rotated if [`rotated`](PageDescriptor::rotated) is set
    pub image_data: Arc<[u8]>,
    pub display_width: Pt,
    pub display_height: Pt,
    pub page_orientation: PageOrientation,
    pub is_last_page: bool,
    /// Whether `image_data` was actually rotated. False when rotation wasn't
    /// needed, and also when it was needed but failed.
    pub rotated: bool,
}

impl PageDescriptor {
    /// Every page but the last is followed by a page break
    pub fn page_break_after(&self) -> bool {
        !self.is_last_page
    }
}

#[derive(Debug, Default)]
struct Flags {
    cancelled: AtomicBool,
    finished: AtomicBool,
}

/// Shared between a [Generation] and whoever started it, so that the starter
/// can call the generation off and can tell when it is over.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<Flags>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::SeqCst)
    }

    /// The generation has produced its result or been dropped
    pub fn is_finished(&self) -> bool {
        self.0.finished.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FinishOnDrop(CancelToken);

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        self.0 .0.finished.store(true, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
struct PendingPage {
    record: ImageRecord,
    decision: OrientationDecision,
}

/// A document generation in flight: the images and settings captured when it
/// started, with every orientation already decided.
#[derive(Debug)]
pub struct Generation {
    pages: Vec<PendingPage>,
    settings: LayoutSettings,
    parallelism: usize,
    token: CancelToken,
    _finish: FinishOnDrop,
}

impl Generation {
    /// Snapshot `images` and decide their orientations, consulting and filling
    /// `decisions`. Refuses an empty set before doing any layout work.
    pub fn prepare(
        images: &[ImageRecord],
        settings: &LayoutSettings,
        decisions: &mut DecisionCache,
    ) -> Result<Generation, GenerateError> {
        if images.is_empty() {
            return Err(GenerateError::EmptyWorkingSet);
        }

        let settings = settings.normalized();
        let pages = images
            .iter()
            .map(|record| PendingPage {
                record: record.clone(),
                decision: decisions.resolve(record, settings.orientation_mode),
            })
            .collect();

        let token = CancelToken::default();
        Ok(Generation {
            pages,
            settings,
            parallelism: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            token: token.clone(),
            _finish: FinishOnDrop(token),
        })
    }

    /// Limit how many rotations run at once
    pub fn with_parallelism(mut self, parallelism: usize) -> Generation {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Lay out every page, rotating images where their decision asks for it.
    ///
    /// Rotations run concurrently on worker threads, but pages always come back
    /// in working-set order. A failed rotation is not an error: that page falls
    /// back to the original image, laid out unrotated on the same page
    /// orientation.
    pub async fn assemble(
        self,
        rotator: Arc<dyn Rotator>,
    ) -> Result<Vec<PageDescriptor>, GenerateError> {
        let Generation {
            pages,
            settings,
            parallelism,
            token,
            _finish,
        } = self;

        let total = pages.len();
        info!(
            pages = total,
            page_size = %settings.page_size,
            mode = ?settings.orientation_mode,
            margin = %settings.margin,
            "generating document"
        );

        let placed: Vec<PageDescriptor> = stream::iter(pages)
            .map(|page| place(page, settings, Arc::clone(&rotator), token.clone()))
            .buffered(parallelism)
            .collect()
            .await;

        if token.is_cancelled() {
            warn!("document generation cancelled");
            return Err(GenerateError::Cancelled);
        }

        let descriptors: Vec<PageDescriptor> = placed
            .into_iter()
            .enumerate()
            .map(|(i, page)| PageDescriptor {
                is_last_page: i + 1 == total,
                ..page
            })
            .collect();

        info!(pages = descriptors.len(), "document generated");
        Ok(descriptors)
    }
}

async fn place(
    page: PendingPage,
    settings: LayoutSettings,
    rotator: Arc<dyn Rotator>,
    token: CancelToken,
) -> PageDescriptor {
    let PendingPage { record, decision } = page;
    let (width, height) = record.dimensions();

    let mut rotated_data = None;
    if decision.rotation_needed && !token.is_cancelled() {
        match rotate_detached(rotator, Arc::clone(record.pixel_data())).await {
            Ok(data) => rotated_data = Some(data),
            Err(err) => warn!(
                id = %record.id(),
                name = record.display_name(),
                error = %err,
                "rotation failed, placing image unrotated"
            ),
        }
    }

    let (image_data, decision) = match rotated_data {
        Some(data) => (Arc::from(data), decision),
        None => (Arc::clone(record.pixel_data()), decision.without_rotation()),
    };

    let size = compute_display_size(
        width,
        height,
        decision,
        settings.page_size,
        settings.margin,
    );
    debug!(
        id = %record.id(),
        orientation = %decision.resolved_orientation,
        rotated = decision.rotation_needed,
        width = %size.width,
        height = %size.height,
        "page placed"
    );

    PageDescriptor {
        source: record.id(),
        image_data,
        display_width: size.width,
        display_height: size.height,
        page_orientation: decision.resolved_orientation,
        is_last_page: false,
        rotated: decision.rotation_needed,
    }
}

/// Build the pages for `images` in one go, without a [Session](crate::Session).
pub async fn build_document(
    images: &[ImageRecord],
    settings: &LayoutSettings,
    rotator: Arc<dyn Rotator>,
) -> Result<Vec<PageDescriptor>, GenerateError> {
    let mut decisions = DecisionCache::new();
    Generation::prepare(images, settings, &mut decisions)?
        .assemble(rotator)
        .await
}
