use serde::{Deserialize, Serialize};

/// The host's final settings, captured by the configuration layer and
/// reported verbatim alongside the session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostSettings {
    pub auto_position: bool,
    #[serde(rename = "HistoryNoDuplicates")]
    pub history_no_dup: bool,
    pub insert_mode: bool,
    pub line_selection: bool,
    pub quick_edit: bool,
    pub window_alpha: u8,
    pub wrap_text: bool,
    pub color_table: Vec<u32>,
    pub code_page_input: u32,
    pub code_page_output: u32,
    pub font_size_x: i16,
    pub font_size_y: i16,
    pub hot_key: u32,
    pub screen_buffer_size_x: i16,
    pub screen_buffer_size_y: i16,
    pub startup_flags: u32,
    pub virtual_terminal_level: u32,
    pub window_size_x: i16,
    pub window_size_y: i16,
    pub window_origin_x: i16,
    pub window_origin_y: i16,
    pub font_name: String,
    #[serde(rename = "AllowAltF4Close")]
    pub allow_alt_f4_close: bool,
    pub control_key_shortcuts_disabled: bool,
    #[serde(rename = "EnabledColorSelection")]
    pub enable_color_selection: bool,
    pub extended_edit_key: bool,
    pub filter_on_paste: bool,
    pub trim_leading_zeros: bool,
    pub launch_font_name: String,
    #[serde(rename = "CommandHistoriesNumber")]
    pub command_histories: u32,
    pub code_page: u32,
    pub cursor_size: u32,
    pub font_family: u32,
    pub font_weight: u32,
    pub history_buffer_size: u32,
    #[serde(rename = "HistoryBuffersNumber")]
    pub history_buffers: u32,
    pub scroll_scale: u32,
    pub fill_attribute: u16,
    pub popup_fill_attribute: u16,
    pub show_window: u16,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            auto_position: true,
            history_no_dup: false,
            insert_mode: true,
            line_selection: true,
            quick_edit: true,
            window_alpha: 255,
            wrap_text: true,
            color_table: Vec::new(),
            code_page_input: 437,
            code_page_output: 437,
            font_size_x: 8,
            font_size_y: 16,
            hot_key: 0,
            screen_buffer_size_x: 120,
            screen_buffer_size_y: 9001,
            startup_flags: 0,
            virtual_terminal_level: 0,
            window_size_x: 120,
            window_size_y: 30,
            window_origin_x: 0,
            window_origin_y: 0,
            font_name: String::new(),
            allow_alt_f4_close: true,
            control_key_shortcuts_disabled: false,
            enable_color_selection: false,
            extended_edit_key: false,
            filter_on_paste: true,
            trim_leading_zeros: false,
            launch_font_name: String::new(),
            command_histories: 4,
            code_page: 437,
            cursor_size: 25,
            font_family: 0,
            font_weight: 400,
            history_buffer_size: 50,
            history_buffers: 4,
            scroll_scale: 1,
            fill_attribute: 0x07,
            popup_fill_attribute: 0xf5,
            show_window: 1,
        }
    }
}

/// What the host hands over at shutdown besides the aggregator's own state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSnapshot {
    pub launched_from_shortcut: bool,
    pub settings: HostSettings,
}
