//! Element and attribute names.

pub const DOCUMENT: &str = "tangle";
pub const VERSION: &str = "version";
pub const RECORD: &str = "record";
pub const ROOT: &str = "root";

pub const ID: &str = "id";
pub const TAG: &str = "tag";
pub const ATTRIBUTE: &str = "attribute";
pub const IMMUTABLE: &str = "immutable";

pub const INSTANCE: &str = "instance";
pub const ITEMS: &str = "items";
pub const LIST: &str = "list";
pub const ITEM: &str = "item";
pub const MAP: &str = "map";
pub const ENTRY: &str = "entry";
pub const KEY: &str = "key";
pub const VALUE: &str = "value";
pub const FIELDS: &str = "fields";
pub const FIELD: &str = "field";
pub const NAME: &str = "name";

pub const REFERENCE: &str = "reference";
pub const PRIMITIVE: &str = "primitive";
pub const TYPE: &str = "type";

pub const NULL_TYPE: &str = "null";
pub const BOOL_TYPE: &str = "bool";
pub const INT_TYPE: &str = "int";
pub const FLOAT_TYPE: &str = "float";
pub const TEXT_TYPE: &str = "text";
