// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types shared by every Joinery crate: hierarchical names, key
//! material, certificates, command signers, connection configuration,
//! observable state and user notifications.

pub mod certificate;
pub mod connection;
pub mod key_file;
pub mod keys;
pub mod name;
pub mod notify;
pub mod publisher;
pub mod secret;
pub mod signer;

pub use certificate::{Certificate, CertificateError, ValidityPeriod, CERT_BOOKKEEPING_COMPONENTS};
pub use connection::{ConnectionConfig, ConnectionKind, ConnectionStatus, CredentialFiles};
pub use key_file::KeyFileError;
pub use keys::{EcdsaKeyGenerator, KeyAlgorithm, KeyError, KeyGenerator, KeyPair, PrivateKey, PublicKey};
pub use name::{Component, Name, NameError};
pub use notify::{Notification, NotificationLevel, NotificationSink, RecordingSink, TracingSink};
pub use publisher::{Publisher, Subscription};
pub use secret::{Secret, SecretBytes, SecretString};
pub use signer::{Credential, KeySigner, Signer};
