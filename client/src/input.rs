//! Keyboard sampling and the login form
//!
//! [`InputManager`] is the only code that reads macroquad's key state. It
//! produces a plain [`FrameInput`] per frame so the rest of the frontend can be
//! driven (and tested) without a window.

use macroquad::prelude::*;
use shared::InputMessage;

/// Everything the frontend needs from one frame of keyboard state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameInput {
    /// Held movement keys and attack, sent to the authoritative side
    pub movement: InputMessage,
    pub choose_host: bool,
    pub choose_join: bool,
    pub confirm: bool,
    pub back: bool,
    pub switch_field: bool,
    pub erase: bool,
    /// Printable characters typed this frame
    pub typed: Vec<char>,
}

/// Samples keys and turns presses into one-shot events
pub struct InputManager {
    // Previous frame key states for edge detection
    prev_key_1: bool,
    prev_key_2: bool,
    prev_enter: bool,
    prev_escape: bool,
    prev_tab: bool,
    prev_backspace: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_key_1: false,
            prev_key_2: false,
            prev_enter: false,
            prev_escape: false,
            prev_tab: false,
            prev_backspace: false,
        }
    }

    pub fn sample(&mut self) -> FrameInput {
        // Support both WASD and arrow keys
        let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
        let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);
        let attack = is_key_down(KeyCode::Space);

        let key_1 = is_key_down(KeyCode::Key1);
        let key_2 = is_key_down(KeyCode::Key2);
        let enter = is_key_down(KeyCode::Enter) || is_key_down(KeyCode::KpEnter);
        let escape = is_key_down(KeyCode::Escape);
        let tab = is_key_down(KeyCode::Tab);
        let backspace = is_key_down(KeyCode::Backspace);

        let mut typed = Vec::new();
        while let Some(c) = get_char_pressed() {
            if !c.is_control() {
                typed.push(c);
            }
        }

        let frame = FrameInput {
            movement: InputMessage {
                up,
                down,
                left,
                right,
                attack,
            },
            choose_host: key_1 && !self.prev_key_1,
            choose_join: key_2 && !self.prev_key_2,
            confirm: enter && !self.prev_enter,
            back: escape && !self.prev_escape,
            switch_field: tab && !self.prev_tab,
            erase: backspace && !self.prev_backspace,
            typed,
        };

        self.prev_key_1 = key_1;
        self.prev_key_2 = key_2;
        self.prev_enter = enter;
        self.prev_escape = escape;
        self.prev_tab = tab;
        self.prev_backspace = backspace;

        frame
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Username,
    Password,
}

const MAX_FIELD_LEN: usize = 24;

/// Text entry for the static credential check
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    username: String,
    password: String,
    focus: LoginField,
    error: Option<String>,
}

impl LoginForm {
    /// Applies one frame of typing. Returns true when the form is submitted.
    pub fn handle(&mut self, frame: &FrameInput) -> bool {
        if frame.switch_field {
            self.focus = match self.focus {
                LoginField::Username => LoginField::Password,
                LoginField::Password => LoginField::Username,
            };
        }

        let field = match self.focus {
            LoginField::Username => &mut self.username,
            LoginField::Password => &mut self.password,
        };
        if frame.erase {
            field.pop();
        }
        for &c in &frame.typed {
            if field.chars().count() < MAX_FIELD_LEN {
                field.push(c);
            }
        }
        if !frame.typed.is_empty() {
            self.error = None;
        }

        if !frame.confirm {
            return false;
        }
        // Enter on the username field moves on instead of submitting
        if self.focus == LoginField::Username {
            self.focus = LoginField::Password;
            return false;
        }
        true
    }

    pub fn reject(&mut self, message: impl Into<String>) {
        self.password.clear();
        self.error = Some(message.into());
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn masked_password(&self) -> String {
        "*".repeat(self.password.chars().count())
    }

    pub fn focus(&self) -> LoginField {
        self.focus
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing(text: &str) -> FrameInput {
        FrameInput {
            typed: text.chars().collect(),
            ..FrameInput::default()
        }
    }

    fn key(f: impl FnOnce(&mut FrameInput)) -> FrameInput {
        let mut frame = FrameInput::default();
        f(&mut frame);
        frame
    }

    #[test]
    fn test_input_manager_creation() {
        let manager = InputManager::new();
        assert!(!manager.prev_key_1);
        assert!(!manager.prev_enter);
    }

    #[test]
    fn test_login_form_typing_and_submit() {
        let mut form = LoginForm::default();
        assert!(!form.handle(&typing("user")));
        assert!(!form.handle(&key(|f| f.confirm = true)));
        assert_eq!(form.focus(), LoginField::Password);

        assert!(!form.handle(&typing("pass")));
        assert_eq!(form.masked_password(), "****");
        assert!(form.handle(&key(|f| f.confirm = true)));
        assert_eq!(form.username(), "user");
        assert_eq!(form.password(), "pass");
    }

    #[test]
    fn test_login_form_erase_and_switch() {
        let mut form = LoginForm::default();
        form.handle(&typing("usr"));
        form.handle(&key(|f| f.erase = true));
        assert_eq!(form.username(), "us");

        form.handle(&key(|f| f.switch_field = true));
        form.handle(&typing("x"));
        assert_eq!(form.password(), "x");
        form.handle(&key(|f| f.switch_field = true));
        assert_eq!(form.focus(), LoginField::Username);
    }

    #[test]
    fn test_login_form_field_limit() {
        let mut form = LoginForm::default();
        form.handle(&typing(&"a".repeat(40)));
        assert_eq!(form.username().len(), MAX_FIELD_LEN);
    }

    #[test]
    fn test_login_form_reject_clears_password() {
        let mut form = LoginForm::default();
        form.handle(&key(|f| f.switch_field = true));
        form.handle(&typing("nope"));
        form.reject("invalid username or password");

        assert_eq!(form.password(), "");
        assert_eq!(form.error(), Some("invalid username or password"));
        form.handle(&typing("p"));
        assert!(form.error().is_none());
    }
}
