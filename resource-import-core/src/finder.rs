//! The dispatch policy: which filesystem entries become which requests.
//!
//! [`ResourceFinder`] is the [`Visitor`] driven by [`crate::walk::walk`]. For
//! every directory and file it computes a [`ResourceIdentifier`] and decides,
//! based on the current [`TraversalMode`], whether to upload and with what
//! payload.
//!
//! ## Directories (checked in order, first match wins)
//! 1. `_<filetype>` present (`_.ttl`; `_.ru` or `_.rq`): prefixed upload under
//!    the directory's identifier.
//! 2. CREATE only: the first allowed binary format with a `_.<ext>` file is
//!    uploaded as the directory's binary.
//! 3. CREATE only: an empty payload forces the container into existence,
//!    unless the mode skips metaless directories or the directory is a
//!    two-character pair-tree segment.
//!
//! ## Files
//! 1. Name ends in a trigger extension and is not the directory metadata
//!    file: prefixed upload, extension stripped from the identifier.
//! 2. CREATE only: extension is an allowed binary format and the file is not
//!    the directory binary: binary upload with the format's MIME type.
//! 3. Anything else is ignored.
//!
//! Reading a file can fail with an I/O error, which aborts the pass. A failed
//! request does not.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::contract::RepositoryLoader;
use crate::error::ImportError;
use crate::formats::{AllowedBinaryFormats, BinaryFormat};
use crate::mode::{ModeSettings, TraversalMode};
use crate::payload::{PrefixPreamble, ResourceIdentifier, UploadPayload};
use crate::walk::Visitor;

pub struct ResourceFinder<'a, L: ?Sized> {
    root: PathBuf,
    loader: &'a L,
    prefix: PrefixPreamble,
    formats: AllowedBinaryFormats,
    settings: &'static ModeSettings,
}

impl<'a, L> ResourceFinder<'a, L>
where
    L: RepositoryLoader + ?Sized,
{
    /// A finder in CREATE mode.
    pub fn new(
        root: impl Into<PathBuf>,
        loader: &'a L,
        prefix: PrefixPreamble,
        formats: AllowedBinaryFormats,
    ) -> Self {
        ResourceFinder {
            root: root.into(),
            loader,
            prefix,
            formats,
            settings: TraversalMode::Create.settings(),
        }
    }

    pub fn mode(&self) -> TraversalMode {
        self.settings.mode
    }

    pub fn settings(&self) -> &'static ModeSettings {
        self.settings
    }

    pub fn set_mode(&mut self, mode: TraversalMode) {
        self.settings = mode.settings();
    }

    /// Switches mode by name. Unknown names leave the current mode in place.
    pub fn set_finder_mode(&mut self, mode: &str) {
        match mode.parse::<TraversalMode>() {
            Ok(mode) => self.set_mode(mode),
            Err(e) => debug!(current = %self.mode(), "{e}"),
        }
    }

    async fn visit_directory(&self, dir: &Path) -> Result<(), ImportError> {
        let uri_ref = ResourceIdentifier::for_directory(&self.root, dir);

        let mut meta_files = self.directory_metadata_files(dir).into_iter();
        if let Some(meta_file) = meta_files.next() {
            for shadowed in meta_files {
                warn!(
                    file = %shadowed.display(),
                    used = %meta_file.display(),
                    "Directory has more than one metadata file, ignoring this one"
                );
            }
            info!(uri_ref = %uri_ref, "{} container {}", self.settings.log_prefix, uri_ref);
            let payload = self.prefixed_payload(&meta_file)?;
            self.load(uri_ref, payload).await;
            return Ok(());
        }

        if self.mode() != TraversalMode::Create {
            debug!(dir = %dir.display(), "No update file for directory, skipping");
            return Ok(());
        }

        if let Some((binary_file, format)) = self.directory_binary_file(dir) {
            info!(uri_ref = %uri_ref, "{} binary {}", self.settings.log_prefix, uri_ref);
            let payload = binary_payload(&binary_file, format)?;
            self.load(uri_ref, payload).await;
        } else if !(self.settings.skip_dirs_without_meta || is_pair_tree_segment(dir)) {
            info!(uri_ref = %uri_ref, "{} container {}", self.settings.log_prefix, uri_ref);
            self.load(uri_ref, UploadPayload::empty()).await;
        } else {
            debug!(dir = %dir.display(), "Not creating container for directory");
        }
        Ok(())
    }

    async fn visit_file(&self, file: &Path) -> Result<(), ImportError> {
        let Some(filename) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return Ok(());
        };
        if filename.starts_with('.') {
            return Ok(());
        }

        if let Some(file_type) = self.settings.matching_file_type(&filename) {
            if !self.settings.is_metadata_filename(&filename) {
                let uri_ref = ResourceIdentifier::for_file(&self.root, file, file_type);
                info!(uri_ref = %uri_ref, "{} {} from {}", self.settings.log_prefix, uri_ref, filename);
                let payload = self.prefixed_payload(file)?;
                self.load(uri_ref, payload).await;
                return Ok(());
            }
        } else if self.mode() == TraversalMode::Create {
            if let Some(format) = self.binary_format_of(&filename) {
                if filename != format.directory_filename() {
                    let uri_ref = ResourceIdentifier::for_file(&self.root, file, &format.extension);
                    info!(uri_ref = %uri_ref, "{} {} from {}", self.settings.log_prefix, uri_ref, filename);
                    let payload = binary_payload(file, format)?;
                    self.load(uri_ref, payload).await;
                    return Ok(());
                }
            }
        }

        debug!(file = %file.display(), mode = %self.mode(), "Ignoring file");
        Ok(())
    }

    /// Existing metadata files of `dir`, in file-type priority order.
    fn directory_metadata_files(&self, dir: &Path) -> Vec<PathBuf> {
        self.settings
            .metadata_filenames()
            .map(|name| dir.join(name))
            .filter(|path| path.is_file())
            .collect()
    }

    fn directory_binary_file(&self, dir: &Path) -> Option<(PathBuf, &BinaryFormat)> {
        self.formats
            .iter()
            .map(|format| (dir.join(format.directory_filename()), format))
            .find(|(path, _)| path.is_file())
    }

    fn binary_format_of(&self, filename: &str) -> Option<&BinaryFormat> {
        let (_, extension) = filename.rsplit_once('.')?;
        self.formats.find(extension)
    }

    fn prefixed_payload(&self, path: &Path) -> Result<UploadPayload, ImportError> {
        let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
        UploadPayload::prefixed(&self.prefix, file).map_err(|e| ImportError::io(path, e))
    }

    async fn load(&self, uri_ref: ResourceIdentifier, payload: UploadPayload) -> bool {
        let ok = match self.mode() {
            TraversalMode::Create => self.loader.create(uri_ref.clone(), payload).await,
            TraversalMode::Update => self.loader.patch(uri_ref.clone(), payload).await,
        };
        if !ok {
            warn!(uri_ref = %uri_ref, mode = %self.mode(), "Request for resource was not successful");
        }
        ok
    }
}

fn binary_payload(path: &Path, format: &BinaryFormat) -> Result<UploadPayload, ImportError> {
    let file = File::open(path).map_err(|e| ImportError::io(path, e))?;
    UploadPayload::binary(file, &format.mime_type).map_err(|e| ImportError::io(path, e))
}

/// Two-character directory names are pair-tree infrastructure.
pub fn is_pair_tree_segment(dir: &Path) -> bool {
    dir.file_name()
        .map(|name| name.to_string_lossy().chars().count() == 2)
        .unwrap_or(false)
}

#[async_trait]
impl<'a, L> Visitor for ResourceFinder<'a, L>
where
    L: RepositoryLoader + ?Sized,
{
    async fn on_directory(&mut self, dir: &Path) -> Result<(), ImportError> {
        self.visit_directory(dir).await
    }

    async fn on_file(&mut self, file: &Path) -> Result<(), ImportError> {
        self.visit_file(file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRepositoryLoader;
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{layer::Context, Layer, Registry};

    /// Collects WARN events.
    struct WarnCollector {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl<S: tracing::Subscriber> Layer<S> for WarnCollector {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.events.lock().unwrap().push(format!("{:?}", event));
            }
        }
    }

    fn finder_for<'a>(
        root: &Path,
        loader: &'a MockRepositoryLoader,
    ) -> ResourceFinder<'a, MockRepositoryLoader> {
        ResourceFinder::new(
            root,
            loader,
            PrefixPreamble::new("PREFIX ex: <http://example.org/>\n"),
            AllowedBinaryFormats::parse("jpg\npng\n"),
        )
    }

    #[test]
    fn mode_round_trip_restores_settings() {
        let loader = MockRepositoryLoader::new();
        let mut finder = finder_for(Path::new("."), &loader);
        let original = finder.settings();

        finder.set_finder_mode("UPDATE");
        assert_eq!(finder.mode(), TraversalMode::Update);
        assert_eq!(finder.settings().file_types, &[".ru", ".rq"]);
        assert!(finder.settings().skip_dirs_without_meta);
        assert_eq!(finder.settings().log_prefix, "Patching");

        finder.set_finder_mode("CREATE");
        assert_eq!(finder.settings(), original);
        assert_eq!(finder.settings().file_types, &[".ttl"]);
        assert!(!finder.settings().skip_dirs_without_meta);
        assert_eq!(finder.settings().log_prefix, "Creating");
    }

    #[test]
    fn unknown_mode_keeps_previous_mode() {
        let loader = MockRepositoryLoader::new();
        let mut finder = finder_for(Path::new("."), &loader);
        finder.set_mode(TraversalMode::Update);
        finder.set_finder_mode("DELETE");
        assert_eq!(finder.mode(), TraversalMode::Update);
        assert_eq!(finder.settings().log_prefix, "Patching");
    }

    #[test]
    fn pair_tree_segments_are_two_characters() {
        assert!(is_pair_tree_segment(Path::new("root/23")));
        assert!(is_pair_tree_segment(Path::new("root/ab")));
        assert!(!is_pair_tree_segment(Path::new("root/abc")));
        assert!(!is_pair_tree_segment(Path::new("root/a")));
        assert!(!is_pair_tree_segment(Path::new(".")));
    }

    #[tokio::test]
    async fn directory_with_metadata_file_never_gets_empty_container() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("collection");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("_.ttl"), "<> ex:p ex:o .").unwrap();
        fs::write(dir.join("other.txt"), "ignored").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_create()
            .withf(|id, payload| {
                id.as_str() == "collection"
                    && payload.body() == b"PREFIX ex: <http://example.org/>\n<> ex:p ex:o ."
            })
            .times(1)
            .returning(|_, _| true);

        let finder = finder_for(tmp.path(), &loader);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn pair_tree_directory_without_metadata_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("ab");
        fs::create_dir(&dir).unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader.expect_create().times(0);

        let finder = finder_for(tmp.path(), &loader);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn plain_directory_without_metadata_gets_empty_container() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("things");
        fs::create_dir(&dir).unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_create()
            .withf(|id, payload| id.as_str() == "things" && payload.is_empty())
            .times(1)
            .returning(|_, _| true);

        let finder = finder_for(tmp.path(), &loader);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn first_listed_directory_binary_wins() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("image");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("_.png"), [0x89_u8, 0x50]).unwrap();
        fs::write(dir.join("_.jpg"), [0xff_u8, 0xd8]).unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_create()
            .withf(|id, payload| {
                id.as_str() == "image"
                    && payload.content_type() == Some("image/jpeg")
                    && payload.body() == [0xff_u8, 0xd8]
            })
            .times(1)
            .returning(|_, _| true);

        let finder = finder_for(tmp.path(), &loader);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn update_mode_skips_directory_without_update_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("collection");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("_.ttl"), "").unwrap();
        fs::write(dir.join("_.jpg"), "").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader.expect_create().times(0);
        loader.expect_patch().times(0);

        let mut finder = finder_for(tmp.path(), &loader);
        finder.set_mode(TraversalMode::Update);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn update_mode_patches_directory_with_rq_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("collection");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("_.rq"), "INSERT DATA {}").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_patch()
            .withf(|id, payload| id.as_str() == "collection" && payload.body().ends_with(b"INSERT DATA {}"))
            .times(1)
            .returning(|_, _| true);

        let mut finder = finder_for(tmp.path(), &loader);
        finder.set_mode(TraversalMode::Update);
        finder.visit_directory(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn metadata_and_hidden_files_are_not_uploaded_as_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("_.ttl"), "").unwrap();
        fs::write(tmp.path().join(".secret.ttl"), "").unwrap();
        fs::write(tmp.path().join("_.jpg"), "").unwrap();
        fs::write(tmp.path().join("README"), "").unwrap();
        fs::write(tmp.path().join("notes.gif"), "").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader.expect_create().times(0);

        let finder = finder_for(tmp.path(), &loader);
        for name in ["_.ttl", ".secret.ttl", "_.jpg", "README", "notes.gif"] {
            finder.visit_file(&tmp.path().join(name)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn binary_file_uploaded_with_extension_stripped() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("pics")).unwrap();
        let file = tmp.path().join("pics/cat.png");
        fs::write(&file, [1_u8, 2, 3]).unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_create()
            .withf(|id, payload| {
                id.as_str() == "pics/cat"
                    && payload.content_type() == Some("image/png")
                    && payload.body() == [1_u8, 2, 3]
            })
            .times(1)
            .returning(|_, _| true);

        let finder = finder_for(tmp.path(), &loader);
        finder.visit_file(&file).await.unwrap();
    }

    #[tokio::test]
    async fn second_update_file_is_ignored_with_a_warning() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("collection");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("_.ru"), "INSERT DATA { <> ex:p 1 }").unwrap();
        fs::write(dir.join("_.rq"), "INSERT DATA { <> ex:p 2 }").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader
            .expect_patch()
            .withf(|id, payload| {
                id.as_str() == "collection" && payload.body().ends_with(b"INSERT DATA { <> ex:p 1 }")
            })
            .times(1)
            .returning(|_, _| true);

        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = Registry::default().with(WarnCollector {
            events: events.clone(),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut finder = finder_for(tmp.path(), &loader);
        finder.set_mode(TraversalMode::Update);
        finder.visit_directory(&dir).await.unwrap();

        let warnings = events.lock().unwrap();
        assert!(
            warnings
                .iter()
                .any(|msg| msg.contains("more than one metadata file") && msg.contains("_.rq")),
            "Expected a warning naming the ignored _.rq, got: {:?}",
            warnings
        );
    }

    #[tokio::test]
    async fn unreadable_file_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("gone.ttl");

        let mut loader = MockRepositoryLoader::new();
        loader.expect_create().times(0);

        let finder = finder_for(tmp.path(), &loader);
        let err = finder.visit_file(&missing).await.unwrap_err();
        match err {
            ImportError::Io { path, .. } => assert_eq!(path, missing),
            other => panic!("expected an I/O error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_request_does_not_fail_visit() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("data.ttl");
        fs::write(&file, "").unwrap();

        let mut loader = MockRepositoryLoader::new();
        loader.expect_create().times(1).returning(|_, _| false);

        let finder = finder_for(tmp.path(), &loader);
        assert!(finder.visit_file(&file).await.is_ok());
    }
}
