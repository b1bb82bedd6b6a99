/// Story/scene entities handed to the generator by the editing layer.
pub mod model;
/// Project file boundary shape (load/save).
pub mod project;
