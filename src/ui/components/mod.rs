mod column_picker;
mod command_input;
mod confirm;
mod form;
mod input;
mod key_result;
mod picker;
mod search_input;

pub use column_picker::{visible_columns, Column, ColumnEvent, ColumnPicker};
pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{Confirm, ConfirmEvent};
pub use form::{Form, FormEvent};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use picker::{Picker, PickerEvent};
pub use search_input::{SearchEvent, SearchInput};
