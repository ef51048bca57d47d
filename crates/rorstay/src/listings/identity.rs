use serde_json::Value;
use tracing::debug;

use super::domain::Property;
use super::store::{
    Document, DocumentKey, PropertyStore, StoreError, StoreId, DOMAIN_ID_FIELD, NATIVE_ID_FIELD,
};

/// A document found through [`resolve`] together with the key that located it, so
/// follow-up writes target the same record.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedDocument {
    pub(crate) key: DocumentKey,
    pub(crate) document: Document,
}

/// Looks a listing up by domain id, falling back to the store-native id only when the
/// domain lookup misses and `raw` is a syntactically valid native id.
pub(crate) async fn resolve<S>(store: &S, raw: &str) -> Result<Option<ResolvedDocument>, StoreError>
where
    S: PropertyStore + ?Sized,
{
    let domain = DocumentKey::Domain(raw.to_string());
    if let Some(document) = store.find_one(&domain).await? {
        return Ok(Some(ResolvedDocument {
            key: domain,
            document,
        }));
    }

    let Some(native) = StoreId::parse(raw) else {
        return Ok(None);
    };

    debug!(identifier = raw, "domain id miss, retrying by store-native id");
    let key = DocumentKey::Native(native);
    Ok(store
        .find_one(&key)
        .await?
        .map(|document| ResolvedDocument { key, document }))
}

/// Applies identifier precedence: a non-empty domain id wins and the native id is
/// dropped; otherwise the native id becomes the visible id.
pub(crate) fn visible_document(mut document: Document) -> Document {
    let has_domain_id = document
        .get(DOMAIN_ID_FIELD)
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());

    let native = document.remove(NATIVE_ID_FIELD);
    if !has_domain_id {
        if let Some(native) = native {
            let native = match native {
                Value::String(id) => id,
                other => other.to_string(),
            };
            document.insert(DOMAIN_ID_FIELD.to_string(), Value::String(native));
        }
    }
    document
}

pub(crate) fn decode_property(document: Document) -> Result<Property, StoreError> {
    let visible = visible_document(document);
    Ok(serde_json::from_value(Value::Object(visible))?)
}

pub(crate) fn encode_property(property: &Property) -> Result<Document, StoreError> {
    match serde_json::to_value(property)? {
        Value::Object(document) => Ok(document),
        other => Err(StoreError::Codec(format!(
            "listing encoded to a non-object value: {other}"
        ))),
    }
}
