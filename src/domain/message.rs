use serde::Serialize;
use thiserror::Error;

use super::pubkey::{Blockhash, Pubkey, PUBKEY_BYTES};
use super::shortvec::{decode_len, encode_len};

/// High bit of the first byte marks a versioned (non-legacy) message.
pub const VERSION_PREFIX_MASK: u8 = 0x80;

/// Errors decoding the ledger message wire format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("message truncated while reading {0}")]
    Truncated(&'static str),

    #[error("compact-u16 length overflows 16 bits")]
    LengthOverflow,

    #[error("compact-u16 length is not minimally encoded")]
    NonCanonicalLength,

    #[error("unsupported message version {0}")]
    UnsupportedVersion(u8),

    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    #[error("message header requires {required} signers but only {keys} static keys are present")]
    InconsistentHeader { required: u8, keys: usize },

    #[error("{count} {what} exceed the compact-u16 limit")]
    TooMany { what: &'static str, count: usize },
}

/// Message format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageVersion {
    Legacy,
    V0,
}

impl Serialize for MessageVersion {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MessageVersion::Legacy => serializer.serialize_str("legacy"),
            MessageVersion::V0 => serializer.serialize_u8(0),
        }
    }
}

/// Signer and read-only account counts at the head of every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub num_required_signatures: u8,
    pub num_readonly_signed_accounts: u8,
    pub num_readonly_unsigned_accounts: u8,
}

/// Instruction with program and accounts referenced by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub account_key_indexes: Vec<u8>,
    pub data: Vec<u8>,
}

/// Address lookup table reference (v0 messages only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// Decoded versioned transaction message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedMessage {
    pub version: MessageVersion,
    pub header: MessageHeader,
    pub static_account_keys: Vec<Pubkey>,
    pub recent_blockhash: Blockhash,
    pub compiled_instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<AddressTableLookup>,
}

/// Cursor over the raw message bytes.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn peek_u8(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, MessageError> {
        let byte = self.peek_u8().ok_or(MessageError::Truncated(what))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], MessageError> {
        if self.remaining() < len {
            return Err(MessageError::Truncated(what));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn len(&mut self) -> Result<usize, MessageError> {
        let (value, consumed) = decode_len(&self.bytes[self.pos..])?;
        self.pos += consumed;
        Ok(usize::from(value))
    }

    fn pubkey(&mut self, what: &'static str) -> Result<Pubkey, MessageError> {
        let raw = self.take(PUBKEY_BYTES, what)?;
        let mut key = [0u8; PUBKEY_BYTES];
        key.copy_from_slice(raw);
        Ok(Pubkey::new(key))
    }

    fn byte_vec(&mut self, what: &'static str) -> Result<Vec<u8>, MessageError> {
        let len = self.len()?;
        Ok(self.take(len, what)?.to_vec())
    }
}

fn write_len(out: &mut Vec<u8>, len: usize, what: &'static str) -> Result<(), MessageError> {
    let value = u16::try_from(len).map_err(|_| MessageError::TooMany { what, count: len })?;
    encode_len(out, value);
    Ok(())
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8], what: &'static str) -> Result<(), MessageError> {
    write_len(out, bytes.len(), what)?;
    out.extend_from_slice(bytes);
    Ok(())
}

impl VersionedMessage {
    /// Decode a message from its wire bytes. The whole input must be consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self, MessageError> {
        let mut reader = Reader::new(bytes);
        let message = Self::read(&mut reader)?;

        if reader.remaining() > 0 {
            return Err(MessageError::TrailingBytes(reader.remaining()));
        }

        Ok(message)
    }

    /// Decode a message from the front of `bytes`, returning the bytes consumed.
    pub(crate) fn deserialize_prefix(bytes: &[u8]) -> Result<(Self, usize), MessageError> {
        let mut reader = Reader::new(bytes);
        let message = Self::read(&mut reader)?;
        Ok((message, reader.pos))
    }

    fn read(reader: &mut Reader<'_>) -> Result<Self, MessageError> {
        let first = reader.peek_u8().ok_or(MessageError::Truncated("header"))?;

        let version = if first & VERSION_PREFIX_MASK != 0 {
            reader.u8("version prefix")?;
            match first & !VERSION_PREFIX_MASK {
                0 => MessageVersion::V0,
                other => return Err(MessageError::UnsupportedVersion(other)),
            }
        } else {
            MessageVersion::Legacy
        };

        let header = MessageHeader {
            num_required_signatures: reader.u8("header")?,
            num_readonly_signed_accounts: reader.u8("header")?,
            num_readonly_unsigned_accounts: reader.u8("header")?,
        };

        let key_count = reader.len()?;
        let mut static_account_keys = Vec::with_capacity(key_count.min(reader.remaining() / PUBKEY_BYTES));
        for _ in 0..key_count {
            static_account_keys.push(reader.pubkey("static account keys")?);
        }

        if usize::from(header.num_required_signatures) > static_account_keys.len() {
            return Err(MessageError::InconsistentHeader {
                required: header.num_required_signatures,
                keys: static_account_keys.len(),
            });
        }

        let recent_blockhash = reader.pubkey("recent blockhash")?;

        let ix_count = reader.len()?;
        let mut compiled_instructions = Vec::with_capacity(ix_count.min(reader.remaining()));
        for _ in 0..ix_count {
            compiled_instructions.push(CompiledInstruction {
                program_id_index: reader.u8("program id index")?,
                account_key_indexes: reader.byte_vec("instruction accounts")?,
                data: reader.byte_vec("instruction data")?,
            });
        }

        let mut address_table_lookups = Vec::new();
        if version == MessageVersion::V0 {
            let lookup_count = reader.len()?;
            for _ in 0..lookup_count {
                address_table_lookups.push(AddressTableLookup {
                    account_key: reader.pubkey("lookup table key")?,
                    writable_indexes: reader.byte_vec("writable indexes")?,
                    readonly_indexes: reader.byte_vec("readonly indexes")?,
                });
            }
        }

        Ok(VersionedMessage {
            version,
            header,
            static_account_keys,
            recent_blockhash,
            compiled_instructions,
            address_table_lookups,
        })
    }

    /// Encode the message into the canonical bytes that signers sign.
    pub fn serialize(&self) -> Result<Vec<u8>, MessageError> {
        let mut out = Vec::with_capacity(
            4 + 3 + (self.static_account_keys.len() + 1) * PUBKEY_BYTES,
        );

        if self.version == MessageVersion::V0 {
            out.push(VERSION_PREFIX_MASK);
        }

        out.push(self.header.num_required_signatures);
        out.push(self.header.num_readonly_signed_accounts);
        out.push(self.header.num_readonly_unsigned_accounts);

        write_len(&mut out, self.static_account_keys.len(), "static account keys")?;
        for key in &self.static_account_keys {
            out.extend_from_slice(key.as_bytes());
        }

        out.extend_from_slice(self.recent_blockhash.as_bytes());

        write_len(&mut out, self.compiled_instructions.len(), "instructions")?;
        for ix in &self.compiled_instructions {
            out.push(ix.program_id_index);
            write_bytes(&mut out, &ix.account_key_indexes, "instruction accounts")?;
            write_bytes(&mut out, &ix.data, "instruction data bytes")?;
        }

        if self.version == MessageVersion::V0 {
            write_len(&mut out, self.address_table_lookups.len(), "lookup tables")?;
            for lookup in &self.address_table_lookups {
                out.extend_from_slice(lookup.account_key.as_bytes());
                write_bytes(&mut out, &lookup.writable_indexes, "writable indexes")?;
                write_bytes(&mut out, &lookup.readonly_indexes, "readonly indexes")?;
            }
        }

        Ok(out)
    }

    /// Number of signature slots a transaction carrying this message needs.
    pub fn required_signatures(&self) -> usize {
        usize::from(self.header.num_required_signatures)
    }

    /// Keys of the required signers, in slot order.
    pub fn signer_keys(&self) -> &[Pubkey] {
        &self.static_account_keys[..self.required_signatures()]
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A transfer-shaped message with `signers` required signers.
    pub fn message_with_signers(signers: &[Pubkey], version: MessageVersion) -> VersionedMessage {
        let mut keys = signers.to_vec();
        keys.push(Pubkey::new([42u8; PUBKEY_BYTES]));
        keys.push(Pubkey::default());

        let program_index = (keys.len() - 1) as u8;

        VersionedMessage {
            version,
            header: MessageHeader {
                num_required_signatures: signers.len() as u8,
                num_readonly_signed_accounts: 0,
                num_readonly_unsigned_accounts: 1,
            },
            static_account_keys: keys,
            recent_blockhash: Pubkey::new([5u8; PUBKEY_BYTES]),
            compiled_instructions: vec![CompiledInstruction {
                program_id_index: program_index,
                account_key_indexes: vec![0, 1],
                data: vec![2, 0, 0, 0, 64, 66, 15, 0, 0, 0, 0, 0],
            }],
            address_table_lookups: if version == MessageVersion::V0 {
                vec![AddressTableLookup {
                    account_key: Pubkey::new([8u8; PUBKEY_BYTES]),
                    writable_indexes: vec![1],
                    readonly_indexes: vec![0, 2],
                }]
            } else {
                Vec::new()
            },
        }
    }
}
