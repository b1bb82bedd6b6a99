pub(crate) mod caption;
pub(crate) mod frame;
pub(crate) mod surface;
pub(crate) mod text;
