#![forbid(unsafe_code)]

//! The fixed-width record stored in every leaf cell.

use std::borrow::Cow;
use std::fmt;

use crate::types::{Result, StoreError};

/// Usable bytes of the username column.
pub const COLUMN_USERNAME_SIZE: usize = 32;
/// Usable bytes of the email column.
pub const COLUMN_EMAIL_SIZE: usize = 255;

/// Width of the id field.
pub const ID_SIZE: usize = 4;
/// Width of the username field, including its terminator byte.
pub const USERNAME_SIZE: usize = COLUMN_USERNAME_SIZE + 1;
/// Width of the email field, including its terminator byte.
pub const EMAIL_SIZE: usize = COLUMN_EMAIL_SIZE + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

/// Serialized row width.
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

/// One table record.
#[derive(Clone, PartialEq, Eq)]
pub struct Row {
    /// Primary key.
    pub id: u32,
    /// Zero-padded username bytes.
    pub username: [u8; USERNAME_SIZE],
    /// Zero-padded email bytes.
    pub email: [u8; EMAIL_SIZE],
}

impl Row {
    /// Builds a row, rejecting columns longer than their usable width.
    pub fn new(id: u32, username: &str, email: &str) -> Result<Self> {
        if username.len() > COLUMN_USERNAME_SIZE {
            return Err(StoreError::Invalid("username longer than 32 bytes"));
        }
        if email.len() > COLUMN_EMAIL_SIZE {
            return Err(StoreError::Invalid("email longer than 255 bytes"));
        }
        let mut row = Self {
            id,
            username: [0u8; USERNAME_SIZE],
            email: [0u8; EMAIL_SIZE],
        };
        row.username[..username.len()].copy_from_slice(username.as_bytes());
        row.email[..email.len()].copy_from_slice(email.as_bytes());
        Ok(row)
    }

    /// Copies the three fields into `dst`, which must be exactly [`ROW_SIZE`] bytes.
    pub fn serialize_into(&self, dst: &mut [u8]) -> Result<()> {
        let dst: &mut [u8; ROW_SIZE] = dst
            .try_into()
            .map_err(|_| StoreError::Invalid("row buffer has the wrong size"))?;
        self.write_fields(dst);
        Ok(())
    }

    /// Returns the serialized form of the row.
    pub fn to_bytes(&self) -> [u8; ROW_SIZE] {
        let mut buf = [0u8; ROW_SIZE];
        self.write_fields(&mut buf);
        buf
    }

    fn write_fields(&self, dst: &mut [u8; ROW_SIZE]) {
        dst[ID_OFFSET..USERNAME_OFFSET].copy_from_slice(&self.id.to_le_bytes());
        dst[USERNAME_OFFSET..EMAIL_OFFSET].copy_from_slice(&self.username);
        dst[EMAIL_OFFSET..ROW_SIZE].copy_from_slice(&self.email);
    }

    /// Decodes a row from exactly [`ROW_SIZE`] bytes.
    pub fn deserialize(src: &[u8]) -> Result<Self> {
        if src.len() != ROW_SIZE {
            return Err(StoreError::Corruption("row slot has the wrong size"));
        }
        let mut id = [0u8; ID_SIZE];
        id.copy_from_slice(&src[ID_OFFSET..USERNAME_OFFSET]);
        let mut username = [0u8; USERNAME_SIZE];
        username.copy_from_slice(&src[USERNAME_OFFSET..EMAIL_OFFSET]);
        let mut email = [0u8; EMAIL_SIZE];
        email.copy_from_slice(&src[EMAIL_OFFSET..ROW_SIZE]);
        Ok(Self {
            id: u32::from_le_bytes(id),
            username,
            email,
        })
    }

    /// Username up to its first zero byte.
    pub fn username_str(&self) -> Cow<'_, str> {
        until_nul(&self.username)
    }

    /// Email up to its first zero byte.
    pub fn email_str(&self) -> Cow<'_, str> {
        until_nul(&self.email)
    }
}

fn until_nul(field: &[u8]) -> Cow<'_, str> {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end])
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.id,
            self.username_str(),
            self.email_str()
        )
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.id)
            .field("username", &self.username_str())
            .field("email", &self.email_str())
            .finish()
    }
}
