// Service layer

pub mod webdav;
