pub mod compare;
pub mod init;
pub mod inspect;
pub mod run;
pub mod validate;
