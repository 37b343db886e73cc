//! Long-lived deserializer sessions.
//!
//! An [`AvroDeserializer`] is bound to one reader schema and decodes many
//! payloads against it. Each call rebinds the session's cursor to the new
//! bytes and picks one of two paths:
//!
//! - **direct**: no writer schema, or a writer schema whose canonical form
//!   fingerprint equals the reader's
//! - **resolved**: a different writer schema, compiled against the reader
//!   plan for the duration of the call
//!
//! # Example
//! ```
//! use avro_deser::{AvroDeserializer, NativeValue};
//!
//! let schema = r#"{"type": "record", "name": "P", "fields": [
//!     {"name": "a", "type": "long"},
//!     {"name": "b", "type": "string"}
//! ]}"#;
//! let mut deser = AvroDeserializer::new(schema).unwrap();
//! let value = deser.decode(&[0x02, 0x02, b'x'], None).unwrap();
//! assert_eq!(value.get("a"), Some(&NativeValue::Int(1)));
//! assert_eq!(value.get("b").and_then(NativeValue::as_str), Some("x"));
//! deser.close();
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DeserializerConfig;
use crate::convert::{to_native, NativeValue, TypeRegistry};
use crate::error::{DecodeError, DeserializerError, SchemaError};
use crate::reader::{decode_resolved, decode_value, BinaryCursor};
use crate::schema::{DecodePlan, Resolution};
use crate::value::AvroValue;

/// Identity recorded in a [`Reconstruction`].
pub const TYPE_IDENTITY: &str = "avro_deser.AvroDeserializer";

/// Where a session is in its per-call lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Ready for the next call.
    Idle,
    /// Decoding against the reader schema alone.
    DirectDecoding,
    /// Decoding writer bytes through a resolution program.
    ResolvedDecoding,
    /// The last call succeeded.
    Done,
    /// The last call failed; the next call starts afresh.
    Failed,
    /// Resources released.
    Closed,
}

/// Everything needed to rebuild an equivalent session.
///
/// Only the reader schema is carried: a rebuilt session does not track
/// types, whatever the original did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconstruction {
    pub type_identity: String,
    pub reader_schema: String,
}

impl Reconstruction {
    /// Construct a fresh session from the recorded reader schema.
    pub fn rebuild(&self) -> Result<AvroDeserializer, DeserializerError> {
        if self.type_identity != TYPE_IDENTITY {
            return Err(SchemaError::InvalidSchema(format!(
                "Cannot rebuild unknown type '{}'",
                self.type_identity
            ))
            .into());
        }
        AvroDeserializer::new(&self.reader_schema)
    }
}

// Fields drop in declaration order: the cursor goes before the plan that
// holds the schema graph.
#[derive(Debug)]
struct Resources {
    cursor: BinaryCursor,
    plan: Arc<DecodePlan>,
}

/// A deserializer bound to one reader schema.
#[derive(Debug)]
pub struct AvroDeserializer {
    resources: Option<Resources>,
    registry: Option<TypeRegistry>,
    reader_schema: String,
    config: DeserializerConfig,
    state: DecodeState,
}

impl AvroDeserializer {
    /// Create a session for `reader_schema` with default configuration.
    pub fn new(reader_schema: &str) -> Result<Self, DeserializerError> {
        Self::with_config(reader_schema, DeserializerConfig::default())
    }

    /// Create a session, optionally tracking named types.
    pub fn with_types(reader_schema: &str, track_types: bool) -> Result<Self, DeserializerError> {
        Self::with_config(
            reader_schema,
            DeserializerConfig::default().with_track_types(track_types),
        )
    }

    /// Create a tracking session that records into an existing registry.
    ///
    /// A registry taken from one session with
    /// [`into_types`](Self::into_types) can be handed to the next, so named
    /// types met by several sessions accumulate in one place.
    pub fn with_registry(
        reader_schema: &str,
        registry: TypeRegistry,
    ) -> Result<Self, DeserializerError> {
        let config = DeserializerConfig::default().with_track_types(true);
        let mut deser = Self::with_config(reader_schema, config)?;
        deser.registry = Some(registry);
        Ok(deser)
    }

    /// Create a session with explicit configuration.
    pub fn with_config(
        reader_schema: &str,
        config: DeserializerConfig,
    ) -> Result<Self, DeserializerError> {
        let plan = DecodePlan::from_schema_text(reader_schema, config.strict_schema)?;
        Ok(Self::from_plan(Arc::new(plan), config))
    }

    /// Create a session sharing an existing plan.
    pub fn from_plan(plan: Arc<DecodePlan>, config: DeserializerConfig) -> Self {
        debug!(
            fingerprint = plan.fingerprint(),
            nodes = plan.graph().len(),
            track_types = config.track_types,
            "Opened deserializer"
        );
        let reader_schema = plan.source().to_string();
        let registry = config.track_types.then(TypeRegistry::new);
        Self {
            resources: Some(Resources {
                cursor: BinaryCursor::new(),
                plan,
            }),
            registry,
            reader_schema,
            config,
            state: DecodeState::Idle,
        }
    }

    /// Decode `buffer` into a native value.
    ///
    /// With `writer_schema`, the bytes are read as that schema wrote them and
    /// resolved into the reader schema.
    pub fn decode(
        &mut self,
        buffer: &[u8],
        writer_schema: Option<&str>,
    ) -> Result<NativeValue, DeserializerError> {
        let value = self.decode_value(buffer, writer_schema)?;
        let resources = self.resources.as_ref().ok_or(DeserializerError::Closed)?;
        match to_native(value, &resources.plan, self.registry.as_mut()) {
            Ok(native) => Ok(native),
            Err(e) => {
                self.state = DecodeState::Failed;
                Err(e.into())
            }
        }
    }

    /// Decode `buffer` written with the reader schema.
    pub fn deserialize(&mut self, buffer: &[u8]) -> Result<NativeValue, DeserializerError> {
        self.decode(buffer, None)
    }

    /// Decode `buffer` into the generic value tree without converting it.
    pub fn decode_value(
        &mut self,
        buffer: &[u8],
        writer_schema: Option<&str>,
    ) -> Result<AvroValue, DeserializerError> {
        let Some(resources) = self.resources.as_mut() else {
            return Err(DeserializerError::Closed);
        };
        self.state = DecodeState::Idle;
        let result = resources.decode(buffer, writer_schema, &self.config, &mut self.state);
        self.state = match &result {
            Ok(_) => DecodeState::Done,
            Err(_) => DecodeState::Failed,
        };
        result
    }

    /// Release the cursor, plan and schema. Safe to call repeatedly.
    pub fn close(&mut self) {
        if let Some(resources) = self.resources.take() {
            drop(resources);
            debug!("Closed deserializer");
        }
        self.state = DecodeState::Closed;
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.resources.is_none()
    }

    /// What is needed to rebuild this session; available after close.
    pub fn reconstruct(&self) -> Reconstruction {
        Reconstruction {
            type_identity: TYPE_IDENTITY.to_string(),
            reader_schema: self.reader_schema.clone(),
        }
    }

    /// Named types met so far, when tracking.
    pub fn types(&self) -> Option<&TypeRegistry> {
        self.registry.as_ref()
    }

    /// Consume the session and hand back its registry, when tracking.
    pub fn into_types(self) -> Option<TypeRegistry> {
        self.registry
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// The reader schema text, verbatim.
    pub fn reader_schema(&self) -> &str {
        &self.reader_schema
    }

    /// The reader plan, until the session is closed.
    pub fn plan(&self) -> Option<&Arc<DecodePlan>> {
        self.resources.as_ref().map(|r| &r.plan)
    }

    /// Configuration the session was opened with.
    pub fn config(&self) -> &DeserializerConfig {
        &self.config
    }
}

impl Resources {
    fn decode(
        &mut self,
        buffer: &[u8],
        writer_schema: Option<&str>,
        config: &DeserializerConfig,
        state: &mut DecodeState,
    ) -> Result<AvroValue, DeserializerError> {
        self.cursor.try_reset(buffer)?;
        let limits = config.limits();

        let resolution = match writer_schema {
            None => None,
            Some(text) => {
                let writer = DecodePlan::from_schema_text(text, config.strict_schema)?;
                if writer.fingerprint() == self.plan.fingerprint() {
                    trace!("Writer schema matches reader schema");
                    None
                } else {
                    Some(Resolution::new(Arc::new(writer), Arc::clone(&self.plan))?)
                }
            }
        };

        let value = match &resolution {
            None => {
                *state = DecodeState::DirectDecoding;
                trace!(len = buffer.len(), "Decoding directly");
                decode_value(&mut self.cursor, &self.plan, &limits)?
            }
            Some(resolution) => {
                *state = DecodeState::ResolvedDecoding;
                debug!(
                    len = buffer.len(),
                    steps = resolution.len(),
                    "Decoding through writer schema resolution"
                );
                decode_resolved(&mut self.cursor, resolution, &limits)?
            }
        };

        if !config.allow_trailing_bytes && !self.cursor.is_exhausted() {
            return Err(DecodeError::TrailingBytes {
                position: self.cursor.position(),
                remaining: self.cursor.remaining(),
            }
            .into());
        }
        Ok(value)
    }
}
