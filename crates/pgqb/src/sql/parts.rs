/// One piece of a [`Sql`](super::Sql) buffer.
///
/// Placeholders stay symbolic until the buffer is rendered, so fragments can be
/// composed in any order and still number strictly left to right.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SqlPart {
    Raw(String),
    Param,
}
