use crate::assemble::{CancelToken, GenerateError, Generation, PageDescriptor};
use crate::image::{ImageId, ImageRecord, IntakeError};
use crate::orientation::{DecisionCache, OrientationDecision};
use crate::settings::LayoutSettings;
use crate::transform::Rotator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Whether a session is currently producing a document
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Generating,
}

/// The working set of images staged for a document, the settings they will be
/// laid out with, and the cached auto-orientation decisions for them.
///
/// Only one generation can be in flight at a time. Changing the working set or
/// the settings while one is running cancels it, and it finishes without
/// producing any pages. The session stays [`GenerationState::Generating`] until
/// the cancelled [`Generation`] has finished or been dropped, then goes back to
/// [`GenerationState::Idle`].
#[derive(Debug, Default)]
pub struct Session {
    images: Vec<ImageRecord>,
    settings: LayoutSettings,
    decisions: DecisionCache,
    active: Option<CancelToken>,
    next_id: u64,
}

impl Session {
    pub fn new(settings: LayoutSettings) -> Session {
        Session {
            settings: settings.normalized(),
            ..Session::default()
        }
    }

    /// The images in document order
    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageRecord> {
        self.images.iter().find(|image| image.id() == id)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// The cached auto-orientation decision for an image, if one has been made
    pub fn cached_decision(&self, id: ImageId) -> Option<OrientationDecision> {
        self.decisions.get(id)
    }

    pub fn state(&self) -> GenerationState {
        match &self.active {
            Some(token) if !token.is_finished() => GenerationState::Generating,
            _ => GenerationState::Idle,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.state() == GenerationState::Generating
    }

    /// Reserve an id no image in the working set is using. Ids count up from
    /// the highest one seen and wrap past `u64::MAX` to the lowest free one.
    pub fn next_image_id(&mut self) -> ImageId {
        // fewer images than ids, so this finds a free one
        let mut candidate = self.next_id;
        while self.get(ImageId(candidate)).is_some() {
            candidate = candidate.wrapping_add(1);
        }
        self.next_id = candidate.wrapping_add(1);
        ImageId(candidate)
    }

    /// Append an image to the end of the working set
    pub fn add_image(&mut self, image: ImageRecord) -> Result<ImageId, IntakeError> {
        let id = image.id();
        if self.get(id).is_some() {
            return Err(IntakeError::DuplicateId(id));
        }

        self.next_id = self.next_id.max(id.0.saturating_add(1));
        debug!(
            id = %id,
            name = image.display_name(),
            width = image.natural_width(),
            height = image.natural_height(),
            "image added"
        );
        self.images.push(image);
        self.working_set_changed();
        Ok(id)
    }

    /// Decode the header of `data` and append it under a fresh id
    pub fn add_bytes<S: ToString>(
        &mut self,
        display_name: S,
        data: Vec<u8>,
    ) -> Result<ImageId, IntakeError> {
        let image = ImageRecord::from_bytes(self.next_image_id(), display_name, data)?;
        self.add_image(image)
    }

    /// Read an image file and append it under a fresh id
    pub fn add_path<P: AsRef<Path>>(&mut self, path: P) -> Result<ImageId, IntakeError> {
        let image = ImageRecord::from_path(self.next_image_id(), path)?;
        self.add_image(image)
    }

    /// Take an image out of the working set, forgetting its cached decision
    pub fn remove_image(&mut self, id: ImageId) -> Option<ImageRecord> {
        let index = self.images.iter().position(|image| image.id() == id)?;
        let image = self.images.remove(index);
        self.decisions.invalidate(id);
        debug!(id = %id, "image removed");
        self.working_set_changed();
        Some(image)
    }

    /// Remove every image
    pub fn clear(&mut self) {
        if self.images.is_empty() {
            return;
        }
        self.images.clear();
        self.decisions.clear();
        debug!("working set cleared");
        self.working_set_changed();
    }

    /// Replace the layout settings. Any change drops every cached decision.
    pub fn set_settings(&mut self, settings: LayoutSettings) {
        let settings = settings.normalized();
        if settings == self.settings {
            return;
        }
        self.settings = settings;
        self.decisions.clear();
        debug!(?settings, "layout settings changed");
        self.working_set_changed();
    }

    /// Move from idle to generating, capturing the current images and settings.
    ///
    /// Refused while another generation is running, and when there are no
    /// images; in both cases the session is left as it was.
    pub fn begin_generation(&mut self) -> Result<Generation, GenerateError> {
        if self.is_generating() {
            warn!("generation requested while one is already running");
            return Err(GenerateError::AlreadyGenerating);
        }

        let generation = Generation::prepare(&self.images, &self.settings, &mut self.decisions)?;
        self.active = Some(generation.token());
        Ok(generation)
    }

    /// Generate the pages for the current working set
    pub async fn generate(
        &mut self,
        rotator: Arc<dyn Rotator>,
    ) -> Result<Vec<PageDescriptor>, GenerateError> {
        self.begin_generation()?.assemble(rotator).await
    }

    fn working_set_changed(&mut self) {
        if let Some(token) = &self.active {
            if !token.is_finished() && !token.is_cancelled() {
                warn!("working set changed during generation, cancelling it");
                token.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::tests::png_bytes;
    use crate::orientation::OrientationMode;
    use crate::pagesize::{PageOrientation, PageSizeName};
    use crate::transform::JpegRotator;
    use crate::units::Pt;
    use futures::executor::block_on;

    fn session(mode: OrientationMode) -> Session {
        Session::new(LayoutSettings::new(PageSizeName::A4, mode, Pt(20.0)))
    }

    fn rotator() -> Arc<dyn Rotator> {
        Arc::new(JpegRotator::default())
    }

    #[test]
    fn ids_are_unique_and_order_is_kept() {
        let mut session = session(OrientationMode::Auto);
        let a = session.add_bytes("a.png", png_bytes(10, 20)).unwrap();
        let b = session.add_bytes("a.png", png_bytes(10, 20)).unwrap();
        let c = session
            .add_image(ImageRecord::new(ImageId(100), "c", 5, 5, vec![0u8]).unwrap())
            .unwrap();
        let d = session.add_bytes("d.png", png_bytes(20, 10)).unwrap();

        assert_ne!(a, b);
        assert!(d.0 > c.0);
        let order: Vec<_> = session.images().iter().map(|i| i.id()).collect();
        assert_eq!(order, vec![a, b, c, d]);
    }

    #[test]
    fn ids_wrap_around_after_the_largest() {
        let mut session = session(OrientationMode::Auto);
        let zero = session.add_bytes("zero.png", png_bytes(4, 4)).unwrap();
        let max = session
            .add_image(ImageRecord::new(ImageId(u64::MAX), "max", 5, 5, vec![0u8]).unwrap())
            .unwrap();

        let next = session.add_bytes("y.png", png_bytes(4, 4)).unwrap();
        let after = session.add_bytes("z.png", png_bytes(4, 4)).unwrap();
        assert_eq!(zero, ImageId(0));
        assert_eq!(next, ImageId(1));
        assert_eq!(after, ImageId(2));
        assert_eq!(session.len(), 4);

        let ids: std::collections::HashSet<_> = session.images().iter().map(|i| i.id()).collect();
        assert_eq!(ids.len(), 4);
        assert!(ids.contains(&max));
    }

    #[test]
    fn duplicate_ids_are_refused() {
        let mut session = session(OrientationMode::Auto);
        let image = ImageRecord::new(ImageId(1), "one", 5, 5, vec![0u8]).unwrap();
        session.add_image(image.clone()).unwrap();
        assert!(matches!(
            session.add_image(image),
            Err(IntakeError::DuplicateId(ImageId(1)))
        ));
        assert_eq!(session.len(), 1);
    }

    #[test]
    fn non_images_are_refused() {
        let mut session = session(OrientationMode::Auto);
        assert!(matches!(
            session.add_bytes("readme.txt", b"plain text".to_vec()),
            Err(IntakeError::InvalidFileKind { .. })
        ));
        assert!(session.is_empty());
    }

    #[test]
    fn empty_session_refuses_to_generate() {
        let mut session = session(OrientationMode::Portrait);
        assert_eq!(
            block_on(session.generate(rotator())),
            Err(GenerateError::EmptyWorkingSet)
        );
        assert_eq!(session.state(), GenerationState::Idle);
    }

    #[test]
    fn second_generation_is_refused_while_first_runs() {
        let mut session = session(OrientationMode::Portrait);
        session.add_bytes("a.png", png_bytes(30, 10)).unwrap();

        let first = session.begin_generation().unwrap();
        assert_eq!(session.state(), GenerationState::Generating);
        assert!(matches!(
            session.begin_generation(),
            Err(GenerateError::AlreadyGenerating)
        ));

        let pages = block_on(first.assemble(rotator())).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(session.state(), GenerationState::Idle);

        // and the session is usable again
        assert_eq!(block_on(session.generate(rotator())).unwrap().len(), 1);
    }

    #[test]
    fn mutation_cancels_running_generation() {
        let mut session = session(OrientationMode::Portrait);
        let a = session.add_bytes("a.png", png_bytes(30, 10)).unwrap();
        session.add_bytes("b.png", png_bytes(10, 30)).unwrap();

        let generation = session.begin_generation().unwrap();
        session.remove_image(a).unwrap();
        assert!(session.is_generating());

        assert_eq!(
            block_on(generation.assemble(rotator())),
            Err(GenerateError::Cancelled)
        );
        assert_eq!(session.state(), GenerationState::Idle);

        let pages = block_on(session.generate(rotator())).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_last_page);
    }

    #[test]
    fn settings_change_cancels_running_generation() {
        let mut session = session(OrientationMode::Portrait);
        session.add_bytes("a.png", png_bytes(30, 10)).unwrap();

        let generation = session.begin_generation().unwrap();
        let mut settings = *session.settings();
        settings.margin = Pt(5.0);
        session.set_settings(settings);

        assert_eq!(
            block_on(generation.assemble(rotator())),
            Err(GenerateError::Cancelled)
        );
    }

    #[test]
    fn unchanged_settings_do_not_cancel() {
        let mut session = session(OrientationMode::Portrait);
        session.add_bytes("a.png", png_bytes(30, 10)).unwrap();

        let generation = session.begin_generation().unwrap();
        session.set_settings(*session.settings());
        session.remove_image(ImageId(9999));
        assert!(block_on(generation.assemble(rotator())).is_ok());
    }

    #[test]
    fn decision_cache_follows_the_working_set() {
        let mut session = session(OrientationMode::Auto);
        let wide = session.add_bytes("wide.png", png_bytes(40, 10)).unwrap();
        let tall = session.add_bytes("tall.png", png_bytes(10, 40)).unwrap();
        assert_eq!(session.cached_decision(wide), None);

        block_on(session.generate(rotator())).unwrap();
        assert_eq!(
            session.cached_decision(wide).map(|d| d.resolved_orientation),
            Some(PageOrientation::Landscape)
        );
        assert!(session.cached_decision(tall).is_some());

        session.remove_image(wide);
        assert_eq!(session.cached_decision(wide), None);
        assert!(session.cached_decision(tall).is_some());

        let mut settings = *session.settings();
        settings.orientation_mode = OrientationMode::Landscape;
        session.set_settings(settings);
        assert_eq!(session.cached_decision(tall), None);
    }

    #[test]
    fn clear_empties_everything() {
        let mut session = session(OrientationMode::Auto);
        session.add_bytes("a.png", png_bytes(40, 10)).unwrap();
        block_on(session.generate(rotator())).unwrap();

        session.clear();
        assert!(session.is_empty());
        assert_eq!(session.cached_decision(ImageId(0)), None);
        assert_eq!(
            block_on(session.generate(rotator())),
            Err(GenerateError::EmptyWorkingSet)
        );
    }
}
