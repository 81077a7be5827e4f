//! Delivery: download tokens, signed file URLs and bonus links.

mod bonus;
mod errors;
mod signed_url;
mod token;

pub use bonus::{BonusClaim, BonusLinkSigner};
pub use errors::{DeliveryError, FulfillmentError, LinkError};
pub use signed_url::{UrlSigner, FILES_PREFIX};
pub use token::{
    generate_token_value, is_well_formed, DownloadToken, Redemption, TokenKind, TokenState,
};
