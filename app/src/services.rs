//! Lazily created detection services
//!
//! The OCR engine, entity model and face detector are expensive to bring up
//! and optional. Each is created on first use and cached, including a
//! failure: an unavailable service is logged once and then stays off.

use deid_core::{EntityModel, LexiconSource};
use deid_ocr::{OcrEngine, TesseractConfig, TesseractEngine};
use deid_vision::FaceDetector;
use once_cell::sync::OnceCell;
use std::path::PathBuf;

use crate::config::DeidConfig;

/// What the services are built from.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub tesseract: TesseractConfig,
    pub lexicon: LexiconSource,
    pub face_model: PathBuf,
}

impl From<&DeidConfig> for ServiceSettings {
    fn from(config: &DeidConfig) -> Self {
        Self {
            tesseract: config.tesseract.clone(),
            lexicon: config
                .entity_lexicon_path
                .as_ref()
                .map_or(LexiconSource::Builtin, |p| LexiconSource::Path(p.into())),
            face_model: PathBuf::from(&config.face_model_path),
        }
    }
}

pub struct Services {
    settings: ServiceSettings,
    ocr: OnceCell<Option<Box<dyn OcrEngine>>>,
    entities: OnceCell<Option<EntityModel>>,
    faces: OnceCell<Option<FaceDetector>>,
}

impl Services {
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            settings,
            ocr: OnceCell::new(),
            entities: OnceCell::new(),
            faces: OnceCell::new(),
        }
    }

    /// Services with the components fixed up front. `None` means the
    /// component is off.
    pub fn with_components(
        ocr: Option<Box<dyn OcrEngine>>,
        entities: Option<EntityModel>,
        faces: Option<FaceDetector>,
    ) -> Self {
        Self {
            settings: ServiceSettings::from(&DeidConfig::default()),
            ocr: OnceCell::with_value(ocr),
            entities: OnceCell::with_value(entities),
            faces: OnceCell::with_value(faces),
        }
    }

    pub fn ocr(&self) -> Option<&dyn OcrEngine> {
        self.ocr
            .get_or_init(|| match TesseractEngine::new(self.settings.tesseract.clone()) {
                Ok(engine) => {
                    let audit = engine.audit_info();
                    log::info!(
                        "[Pipeline] OCR engine {} {} (tessdata {})",
                        audit.engine,
                        audit.engine_version.as_deref().unwrap_or("?"),
                        audit.tessdata_hash.as_deref().unwrap_or("unknown")
                    );
                    Some(Box::new(engine) as Box<dyn OcrEngine>)
                }
                Err(e) => {
                    log::warn!("[Pipeline] OCR disabled: {}", e);
                    None
                }
            })
            .as_deref()
    }

    pub fn entity_model(&self) -> Option<&EntityModel> {
        self.entities
            .get_or_init(|| match EntityModel::load(self.settings.lexicon.clone()) {
                Ok(model) => Some(model),
                Err(e) => {
                    log::warn!("[Pipeline] {}; entity detection disabled", e);
                    None
                }
            })
            .as_ref()
    }

    pub fn face_detector(&self) -> Option<&FaceDetector> {
        self.faces
            .get_or_init(|| match FaceDetector::load(&self.settings.face_model) {
                Ok(detector) => Some(detector),
                Err(e) => {
                    log::warn!("[Pipeline] {}; face detection disabled", e);
                    None
                }
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_config() {
        let mut cfg = DeidConfig::default();
        cfg.entity_lexicon_path = Some("/data/lexicon.json".into());
        let settings = ServiceSettings::from(&cfg);
        assert_eq!(
            settings.lexicon,
            LexiconSource::Path(PathBuf::from("/data/lexicon.json"))
        );
        assert_eq!(settings.face_model, PathBuf::from(crate::config::DEFAULT_FACE_MODEL));
    }

    #[test]
    fn test_missing_face_model_stays_disabled() {
        let mut cfg = DeidConfig::default();
        cfg.face_model_path = "/nonexistent/face.bin".into();
        let services = Services::new(ServiceSettings::from(&cfg));
        assert!(services.face_detector().is_none());
        assert!(services.face_detector().is_none());
    }

    #[test]
    fn test_builtin_entity_model_loads_once() {
        let services = Services::new(ServiceSettings::from(&DeidConfig::default()));
        let first = services.entity_model().map(|m| m as *const EntityModel);
        let second = services.entity_model().map(|m| m as *const EntityModel);
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[test]
    fn test_fixed_components() {
        let services = Services::with_components(None, None, None);
        assert!(services.ocr().is_none());
        assert!(services.entity_model().is_none());
        assert!(services.face_detector().is_none());
    }
}
