pub mod qr_service;

pub use qr_service::{ LogoUpload, QrRequest, QrService };
