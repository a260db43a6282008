mod command_input;
mod delete_confirm;
mod input;
mod key_result;
mod note_card;
mod note_form;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use delete_confirm::{DeleteConfirm, DeleteOutcome, DeletePhase};
pub use input::{InputResult, TextInput};
pub use key_result::KeyResult;
pub use note_card::NoteCard;
pub use note_form::{FormEvent, FormField, NoteForm};
pub use toast::{Toast, ToastKind, Toasts};
