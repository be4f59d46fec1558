use bytes::Bytes;

use crate::errors::FieldErrors;

/// One uploaded part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    /// Browsers submit an empty part for an untouched file input; an empty
    /// upload means "no upload" everywhere in this module.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
    }
}

/// Raw form fields as collected from the request, before validation.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
    pub image: Option<UploadedFile>,
}

/// Which variant of the form is being validated. Create and edit share one
/// rule table; the only difference is whether the asset fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit,
}

/// Outcome of a successful validation: typed fields, with `None` assets on
/// edit meaning "keep the existing blob".
#[derive(Debug)]
pub struct ValidatedProductForm {
    pub name: String,
    pub price_cents: i64,
    pub description: String,
    pub file: Option<UploadedFile>,
    pub image: Option<UploadedFile>,
}

/// Rule table for the two asset fields, shared between modes.
struct AssetRule {
    field: &'static str,
    required_on_create: bool,
    image_only: bool,
}

const ASSET_RULES: [AssetRule; 2] = [
    AssetRule {
        field: "file",
        required_on_create: true,
        image_only: false,
    },
    AssetRule {
        field: "image",
        required_on_create: true,
        image_only: true,
    },
];

const MSG_REQUIRED: &str = "Required";
const MSG_PRICE: &str = "Must be a whole number of at least 1";
const MSG_IMAGE_TYPE: &str = "Invalid image type";

fn push_error(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn required_text(
    value: Option<&str>,
    field: &'static str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => Some(v.to_string()),
        None => {
            push_error(errors, field, MSG_REQUIRED);
            None
        }
    }
}

fn coerce_price(value: Option<&str>, errors: &mut FieldErrors) -> Option<i64> {
    let raw = match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            push_error(errors, "price", MSG_REQUIRED);
            return None;
        }
    };

    match raw.parse::<i64>() {
        Ok(cents) if cents >= 1 => Some(cents),
        _ => {
            push_error(errors, "price", MSG_PRICE);
            None
        }
    }
}

/// Validates a raw form against the shared rule table.
///
/// Never touches the metadata or blob store; infrastructure is only reached
/// after validation succeeds. Field errors accumulate so a single submission
/// reports every offending field at once.
pub fn validate(form: ProductForm, mode: FormMode) -> Result<ValidatedProductForm, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = required_text(form.name.as_deref(), "name", &mut errors);
    let price_cents = coerce_price(form.price.as_deref(), &mut errors);
    let description = required_text(form.description.as_deref(), "description", &mut errors);

    let mut uploads: [Option<UploadedFile>; 2] = [form.file, form.image];
    for (slot, rule) in uploads.iter_mut().zip(ASSET_RULES.iter()) {
        // Normalize empty parts to "no upload" before applying the rules.
        let upload = slot.take().filter(|u| !u.is_empty());

        match upload {
            None => {
                if mode == FormMode::Create && rule.required_on_create {
                    push_error(&mut errors, rule.field, MSG_REQUIRED);
                }
            }
            Some(upload) => {
                if rule.image_only && !upload.is_image() {
                    push_error(&mut errors, rule.field, MSG_IMAGE_TYPE);
                } else {
                    *slot = Some(upload);
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let [file, image] = uploads;
    Ok(ValidatedProductForm {
        // Unwraps are safe: a None here always pushed a field error above.
        name: name.expect("validated"),
        price_cents: price_cents.expect("validated"),
        description: description.expect("validated"),
        file,
        image,
    })
}
