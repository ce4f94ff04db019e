// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU handling
// ABOUTME: Generates the PduBody variant set with its dispatch, and fluent builder setters

/// Macro for generating the closed set of PDU bodies
///
/// Every SMPP v3.4 command_id gets exactly one variant, so dispatch is a
/// single exhaustive `match` in both directions.
///
/// # Arguments
/// * `empty { .. }` - header-only operations (no mandatory fields)
/// * `fields { Variant(Type), .. }` - operations with a body type
/// * `boxed { Variant(Type), .. }` - like `fields`, stored in a `Box` to keep
///   `PduBody` small
///
/// Each variant name must match a `CommandId` variant.
///
/// # Generated code
/// - `enum PduBody` with the listed variants plus `Unknown { command_id, body }`
/// - `PduBody::command_id()`
/// - `PduBody::encode_body()` writing mandatory fields and TLV trailer
/// - `PduBody::decode_body()` dispatching on the header's command_id
macro_rules! pdu_bodies {
    (
        empty { $($empty:ident),* $(,)? }
        fields { $($variant:ident($body:ty)),* $(,)? }
        boxed { $($boxed:ident($boxed_body:ty)),* $(,)? }
    ) => {
        /// Body of one PDU, tagged by operation.
        #[derive(Clone, Debug, PartialEq)]
        pub enum PduBody {
            $($empty,)*
            $($variant($body),)*
            $($boxed(Box<$boxed_body>),)*
            /// Reserved or vendor command_id, body kept as raw bytes
            Unknown {
                command_id: u32,
                body: bytes::Bytes,
            },
        }

        impl PduBody {
            pub fn command_id(&self) -> $crate::datatypes::CommandId {
                use $crate::datatypes::CommandId;
                match self {
                    $(PduBody::$empty => CommandId::$empty,)*
                    $(PduBody::$variant(_) => CommandId::$variant,)*
                    $(PduBody::$boxed(_) => CommandId::$boxed,)*
                    PduBody::Unknown { command_id, .. } => CommandId::from(*command_id),
                }
            }

            pub(crate) fn encode_body<B: bytes::BufMut>(
                &self,
                buf: &mut B,
            ) -> Result<(), $crate::codec::CodecError> {
                use $crate::codec::Encodable;
                match self {
                    $(PduBody::$empty => Ok(()),)*
                    $(PduBody::$variant(body) => body.encode(buf),)*
                    $(PduBody::$boxed(body) => body.encode(buf),)*
                    PduBody::Unknown { body, .. } => $crate::codec::encode_octets(buf, body),
                }
            }

            pub(crate) fn decode_body(
                header: &$crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
                registry: &$crate::datatypes::TagRegistry,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::Decodable;
                use $crate::datatypes::CommandId;
                match header.command_id {
                    $(CommandId::$empty => {
                        $crate::codec::expect_end(buf, header.command_id)?;
                        Ok(PduBody::$empty)
                    })*
                    $(CommandId::$variant => Ok(PduBody::$variant(
                        <$body as Decodable>::decode(header, buf, registry)?,
                    )),)*
                    $(CommandId::$boxed => Ok(PduBody::$boxed(Box::new(
                        <$boxed_body as Decodable>::decode(header, buf, registry)?,
                    ))),)*
                    CommandId::Unknown(command_id) => {
                        use bytes::Buf;
                        Ok(PduBody::Unknown {
                            command_id,
                            body: buf.copy_to_bytes(buf.remaining()),
                        })
                    }
                }
            }
        }
    };
}

/// Macro for generating builder setter methods
///
/// This macro generates fluent setter methods for builder patterns,
/// where each method takes a value, sets the corresponding field,
/// and returns self for method chaining.
///
/// # Arguments
/// * `$target` - Field of the builder that holds the value being built
/// * `$($field:ident: $type:ty),*` - Field name and type pairs
///
/// # Generated code
/// For each field, generates:
/// ```rust,ignore
/// pub fn $field(mut self, $field: $type) -> Self {
///     self.$target.$field = $field;
///     self
/// }
/// ```
macro_rules! builder_setters {
    ($target:ident; $($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$target.$field = $field;
                self
            }
        )*
    };
}

// Make macros available to the rest of the crate
pub(crate) use {builder_setters, pdu_bodies};
