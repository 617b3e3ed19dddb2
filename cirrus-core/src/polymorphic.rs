//! Polymorphic - Discriminated unions decoded through explicit registries
//!
//! Many API shapes are JSON objects whose concrete type is chosen by a
//! discriminator field (e.g. `modelType`). A [`UnionRegistry`] maps every tag
//! of one union to the decode function of its variant. Registries are built
//! once at startup, never mutated afterwards, and passed by reference to the
//! code that decodes payloads.
//!
//! Unknown tags fail closed: there is no default variant.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A concrete shape of a union, identified on the wire by a fixed tag
///
/// The discriminator is not a field of the type: it is injected on encode and
/// ignored on decode.
pub trait Variant: Serialize + DeserializeOwned {
    /// Name of the discriminator field (e.g. "modelType")
    const DISCRIMINATOR: &'static str;
    /// Tag identifying this variant (e.g. "DATA_LOADER_TASK")
    const TAG: &'static str;
}

/// Sum type over the variants of one union
pub trait Union: Sized {
    /// Union name used in diagnostics (e.g. "PublishedObject")
    const NAME: &'static str;
    /// Name of the discriminator field shared by every variant
    const DISCRIMINATOR: &'static str;

    /// Tag of the variant held by this value
    fn tag(&self) -> &'static str;

    /// Wire form of the held variant, discriminator included
    fn to_wire(&self) -> Result<Value, EncodeError>;
}

/// Errors raised while building a registry
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Union name must not be empty")]
    EmptyUnionName,

    #[error("Discriminator field of {union} must not be empty")]
    EmptyDiscriminator { union: &'static str },

    #[error("Empty tag registered for {union}")]
    EmptyTag { union: &'static str },

    #[error("Tag {tag} is registered twice for {union}")]
    DuplicateTag {
        union: &'static str,
        tag: &'static str,
    },

    #[error("Variant {tag} uses discriminator '{found}', but {union} uses '{expected}'")]
    DiscriminatorMismatch {
        union: &'static str,
        tag: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("No variants registered for {union}")]
    NoVariants { union: &'static str },
}

/// Errors raised while decoding a payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed {union} payload: {source}")]
    Malformed {
        union: &'static str,
        source: serde_json::Error,
    },

    #[error("{union} payload must be a JSON object, got {found}")]
    NotAnObject {
        union: &'static str,
        found: &'static str,
    },

    #[error("{union} payload has no discriminator field '{field}'")]
    MissingDiscriminator {
        union: &'static str,
        field: &'static str,
    },

    #[error("Discriminator field '{field}' of {union} must be a string, got {found}")]
    InvalidDiscriminator {
        union: &'static str,
        field: &'static str,
        found: &'static str,
    },

    #[error("Unknown {union} variant: {tag}")]
    UnknownVariant { union: &'static str, tag: String },

    #[error("Failed to decode {union} variant {tag}: {source}")]
    Variant {
        union: &'static str,
        tag: String,
        source: serde_json::Error,
    },

    #[error("{union} is discriminated by '{expected}', not '{found}'")]
    WrongDiscriminatorField {
        union: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{union} collection has no field '{field}'")]
    MissingCollection { union: &'static str, field: String },

    #[error("{union} collection '{field}' must be a JSON array, got {found}")]
    NotAnArray {
        union: &'static str,
        field: String,
        found: &'static str,
    },

    #[error("Item {index} of {union} collection: {source}")]
    Item {
        union: &'static str,
        index: usize,
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Tag that failed to resolve, for unknown-variant errors (also inside collections)
    pub fn unknown_tag(&self) -> Option<&str> {
        match self {
            DecodeError::UnknownVariant { tag, .. } => Some(tag),
            DecodeError::Item { source, .. } => source.unknown_tag(),
            _ => None,
        }
    }
}

/// Errors raised while encoding a variant
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Failed to encode variant {tag}: {source}")]
    Serialize {
        tag: &'static str,
        source: serde_json::Error,
    },

    #[error("Variant {tag} does not encode to a JSON object")]
    NotAnObject { tag: &'static str },
}

/// Decode function for one variant, producing the union value
pub type DecodeFn<T> = fn(Value) -> Result<T, serde_json::Error>;

/// Transient holder of a parsed payload and its discriminator
struct Envelope {
    tag: String,
    body: Value,
}

impl Envelope {
    fn open(value: Value, union: &'static str, field: &'static str) -> Result<Self, DecodeError> {
        let tag = match &value {
            Value::Object(map) => match map.get(field) {
                Some(Value::String(tag)) => tag.clone(),
                Some(other) => {
                    return Err(DecodeError::InvalidDiscriminator {
                        union,
                        field,
                        found: json_type(other),
                    });
                }
                None => return Err(DecodeError::MissingDiscriminator { union, field }),
            },
            other => {
                return Err(DecodeError::NotAnObject {
                    union,
                    found: json_type(other),
                });
            }
        };

        Ok(Self { tag, body: value })
    }
}

/// Mapping from discriminator tag to variant decoder for one union
pub struct UnionRegistry<T> {
    union_name: &'static str,
    discriminator: &'static str,
    variants: HashMap<&'static str, DecodeFn<T>>,
}

impl<T> std::fmt::Debug for UnionRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnionRegistry")
            .field("union_name", &self.union_name)
            .field("discriminator", &self.discriminator)
            .field("tags", &self.tags())
            .finish()
    }
}

impl<T> UnionRegistry<T> {
    /// Start building a registry for a union
    pub fn builder(
        union_name: &'static str,
        discriminator: &'static str,
    ) -> UnionRegistryBuilder<T> {
        UnionRegistryBuilder {
            union_name,
            discriminator,
            variants: HashMap::new(),
            error: None,
        }
    }

    pub fn union_name(&self) -> &'static str {
        self.union_name
    }

    pub fn discriminator(&self) -> &'static str {
        self.discriminator
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<&'static str> = self.variants.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.variants.contains_key(tag)
    }

    /// Decode a raw JSON payload into the union
    pub fn decode(&self, payload: &[u8]) -> Result<T, DecodeError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|source| DecodeError::Malformed {
                union: self.union_name,
                source,
            })?;
        self.decode_value(value)
    }

    /// Decode an already-parsed JSON value into the union
    pub fn decode_value(&self, value: Value) -> Result<T, DecodeError> {
        let Envelope { tag, body } = Envelope::open(value, self.union_name, self.discriminator)?;

        let Some(decode) = self.variants.get(tag.as_str()) else {
            log::debug!("Rejecting unknown {} variant {}", self.union_name, tag);
            return Err(DecodeError::UnknownVariant {
                union: self.union_name,
                tag,
            });
        };

        decode(body).map_err(|source| DecodeError::Variant {
            union: self.union_name,
            tag,
            source,
        })
    }

    /// Decode every element of an array; the first bad element fails the whole call
    pub fn decode_items(&self, items: Vec<Value>) -> Result<Vec<T>, DecodeError> {
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                self.decode_value(item).map_err(|e| DecodeError::Item {
                    union: self.union_name,
                    index,
                    source: Box::new(e),
                })
            })
            .collect()
    }

    /// Decode the polymorphic array stored under `field` of a JSON object payload
    pub fn decode_collection(&self, payload: &[u8], field: &str) -> Result<Vec<T>, DecodeError> {
        let value: Value =
            serde_json::from_slice(payload).map_err(|source| DecodeError::Malformed {
                union: self.union_name,
                source,
            })?;

        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(DecodeError::NotAnObject {
                    union: self.union_name,
                    found: json_type(&other),
                });
            }
        };

        match map.remove(field) {
            Some(Value::Array(items)) => self.decode_items(items),
            Some(other) => Err(DecodeError::NotAnArray {
                union: self.union_name,
                field: field.to_string(),
                found: json_type(&other),
            }),
            None => Err(DecodeError::MissingCollection {
                union: self.union_name,
                field: field.to_string(),
            }),
        }
    }
}

impl<T: Union> UnionRegistry<T> {
    /// Start building a registry named and discriminated after `T`
    pub fn for_union() -> UnionRegistryBuilder<T> {
        Self::builder(T::NAME, T::DISCRIMINATOR)
    }
}

/// Builder for [`UnionRegistry`]
///
/// Registration errors are remembered and reported by [`build`](Self::build),
/// so calls can be chained.
pub struct UnionRegistryBuilder<T> {
    union_name: &'static str,
    discriminator: &'static str,
    variants: HashMap<&'static str, DecodeFn<T>>,
    error: Option<RegistryError>,
}

impl<T> UnionRegistryBuilder<T> {
    /// Register a variant type under its own tag
    pub fn variant<V>(mut self) -> Self
    where
        V: Variant + Into<T>,
    {
        if self.error.is_none() && V::DISCRIMINATOR != self.discriminator {
            self.error = Some(RegistryError::DiscriminatorMismatch {
                union: self.union_name,
                tag: V::TAG,
                expected: self.discriminator,
                found: V::DISCRIMINATOR,
            });
            return self;
        }
        self.register(V::TAG, decode_as::<V, T>)
    }

    /// Register a custom decode function for a tag
    pub fn register(mut self, tag: &'static str, decode: DecodeFn<T>) -> Self {
        if self.error.is_some() {
            return self;
        }
        if tag.is_empty() {
            self.error = Some(RegistryError::EmptyTag {
                union: self.union_name,
            });
        } else if self.variants.insert(tag, decode).is_some() {
            self.error = Some(RegistryError::DuplicateTag {
                union: self.union_name,
                tag,
            });
        }
        self
    }

    pub fn build(self) -> Result<UnionRegistry<T>, RegistryError> {
        if self.union_name.is_empty() {
            return Err(RegistryError::EmptyUnionName);
        }
        if self.discriminator.is_empty() {
            return Err(RegistryError::EmptyDiscriminator {
                union: self.union_name,
            });
        }
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.variants.is_empty() {
            return Err(RegistryError::NoVariants {
                union: self.union_name,
            });
        }

        Ok(UnionRegistry {
            union_name: self.union_name,
            discriminator: self.discriminator,
            variants: self.variants,
        })
    }
}

fn decode_as<V, T>(body: Value) -> Result<T, serde_json::Error>
where
    V: DeserializeOwned + Into<T>,
{
    serde_json::from_value::<V>(body).map(Into::into)
}

/// Decode `payload` with `registry`, checking that `discriminator` is the field
/// the registry dispatches on
pub fn decode<T>(
    payload: &[u8],
    discriminator: &str,
    registry: &UnionRegistry<T>,
) -> Result<T, DecodeError> {
    if discriminator != registry.discriminator() {
        return Err(DecodeError::WrongDiscriminatorField {
            union: registry.union_name(),
            expected: registry.discriminator(),
            found: discriminator.to_string(),
        });
    }
    registry.decode(payload)
}

/// Encode a variant, injecting its discriminator tag
pub fn encode_variant<V: Variant>(value: &V) -> Result<Value, EncodeError> {
    let mut encoded = serde_json::to_value(value)
        .map_err(|source| EncodeError::Serialize { tag: V::TAG, source })?;

    match &mut encoded {
        Value::Object(map) => {
            map.insert(
                V::DISCRIMINATOR.to_string(),
                Value::String(V::TAG.to_string()),
            );
        }
        _ => return Err(EncodeError::NotAnObject { tag: V::TAG }),
    }

    Ok(encoded)
}

/// Encode a union value to its wire form
pub fn encode<U: Union>(value: &U) -> Result<Value, EncodeError> {
    value.to_wire()
}

/// Encode every element of a polymorphic list
pub fn encode_items<U: Union>(items: &[U]) -> Result<Vec<Value>, EncodeError> {
    items.iter().map(Union::to_wire).collect()
}

/// A decoded value re-encoded to its wire form
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub tag: &'static str,
    pub wire: Value,
}

/// Errors from a decode-then-encode pass
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Type-erased view of a registry, for tools that pick unions by name
pub trait DynRegistry: Send + Sync {
    fn union_name(&self) -> &'static str;

    fn discriminator(&self) -> &'static str;

    fn tags(&self) -> Vec<&'static str>;

    /// Decode a payload and encode the result back
    fn reencode(&self, payload: &[u8]) -> Result<Decoded, CodecError>;

    /// Decode the collection under `field` and encode each item back
    fn reencode_collection(&self, payload: &[u8], field: &str)
    -> Result<Vec<Decoded>, CodecError>;
}

impl<T: Union> DynRegistry for UnionRegistry<T> {
    fn union_name(&self) -> &'static str {
        UnionRegistry::union_name(self)
    }

    fn discriminator(&self) -> &'static str {
        UnionRegistry::discriminator(self)
    }

    fn tags(&self) -> Vec<&'static str> {
        UnionRegistry::tags(self)
    }

    fn reencode(&self, payload: &[u8]) -> Result<Decoded, CodecError> {
        let value = self.decode(payload)?;
        Ok(Decoded {
            tag: value.tag(),
            wire: value.to_wire()?,
        })
    }

    fn reencode_collection(
        &self,
        payload: &[u8],
        field: &str,
    ) -> Result<Vec<Decoded>, CodecError> {
        let values = self.decode_collection(payload, field)?;
        let mut decoded = Vec::with_capacity(values.len());
        for value in &values {
            decoded.push(Decoded {
                tag: value.tag(),
                wire: value.to_wire()?,
            });
        }
        Ok(decoded)
    }
}

/// Declare a union enum over variant types, with its `Union` impl, `From`
/// conversions and a `registry()` constructor
///
/// ```ignore
/// declare_union! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub enum DeliveredArtifact: "artifactType" {
///         Generic(GenericDeliveredArtifact),
///         ContainerImage(ContainerImageDeliveredArtifact),
///     }
/// }
/// ```
#[macro_export]
macro_rules! declare_union {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $discriminator:literal {
            $( $(#[$vmeta:meta])* $variant:ident ( $ty:ty ) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $( $(#[$vmeta])* $variant($ty), )+
        }

        $(
            impl From<$ty> for $name {
                fn from(value: $ty) -> Self {
                    $name::$variant(value)
                }
            }
        )+

        impl $crate::polymorphic::Union for $name {
            const NAME: &'static str = stringify!($name);
            const DISCRIMINATOR: &'static str = $discriminator;

            fn tag(&self) -> &'static str {
                match self {
                    $( $name::$variant(_) => <$ty as $crate::polymorphic::Variant>::TAG, )+
                }
            }

            fn to_wire(&self) -> Result<::serde_json::Value, $crate::polymorphic::EncodeError> {
                match self {
                    $( $name::$variant(value) => $crate::polymorphic::encode_variant(value), )+
                }
            }
        }

        impl $name {
            /// Registry holding every variant of this union
            pub fn registry() -> Result<
                $crate::polymorphic::UnionRegistry<$name>,
                $crate::polymorphic::RegistryError,
            > {
                $crate::polymorphic::UnionRegistry::<$name>::for_union()
                    $( .variant::<$ty>() )+
                    .build()
            }
        }
    };
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
