#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Username,
    RoomCode,
}

/// Login form filled one field at a time from terminal lines.
#[derive(Debug, Default, Clone)]
pub struct LoginForm {
    username: Option<String>,
    room: Option<String>,
}

impl LoginForm {
    pub fn new(username: Option<String>, room: Option<String>) -> Self {
        let mut form = Self::default();
        if let Some(username) = username {
            form.fill(FormField::Username, &username);
        }
        if let Some(room) = room {
            form.fill(FormField::RoomCode, &room);
        }
        form
    }

    /// Next field still missing, if any.
    pub fn missing(&self) -> Option<FormField> {
        if self.username.is_none() {
            Some(FormField::Username)
        } else if self.room.is_none() {
            Some(FormField::RoomCode)
        } else {
            None
        }
    }

    /// Stores a trimmed value. Blank values leave the field missing.
    pub fn fill(&mut self, field: FormField, value: &str) {
        let value = value.trim();
        let slot = match field {
            FormField::Username => &mut self.username,
            FormField::RoomCode => &mut self.room,
        };
        *slot = (!value.is_empty()).then(|| value.to_string());
    }

    /// Feeds a line into the next missing field.
    pub fn enter(&mut self, line: &str) {
        if let Some(field) = self.missing() {
            self.fill(field, line);
        }
    }

    pub fn clear(&mut self, field: FormField) {
        match field {
            FormField::Username => self.username = None,
            FormField::RoomCode => self.room = None,
        }
    }

    /// `(username, room)` once both are present.
    pub fn submission(&self) -> Option<(&str, &str)> {
        Some((self.username.as_deref()?, self.room.as_deref()?))
    }
}
