//! C++ refactoring operations (§4.H): pure compositions of the syntax tree,
//! symbol, and text-buffer layers — include manipulation, member/method
//! insertion, method deletion, base-class rename, MFC extraction, comment
//! toggling, and text-only block navigation.

pub mod base_class;
pub mod block_nav;
pub mod delete_method;
pub mod error;
pub mod includes;
pub mod members;
pub mod mfc;
pub mod toggle_section;

pub use base_class::{change_base_class_in_header, change_base_class_in_source, rewrite_constructor_initializers};
pub use block_nav::{go_to_block_end, go_to_block_start, select_block_end, select_block_start, select_block_up};
pub use delete_method::delete_method;
pub use error::RefactorError;
pub use includes::{group_includes, insert_include, parse_includes, remove_include, IncludeLine, IncludeScope};
pub use members::{add_member_declaration, add_method_definition, corresponding_header_source, Access};
pub use mfc::{extract_ddx, extract_message_maps, DdxEntry, MessageMapEntry, MESSAGE_MAP_QUERY};
pub use toggle_section::{toggle_section, ToggleSection};
