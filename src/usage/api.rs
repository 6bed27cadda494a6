use std::collections::BTreeMap;

macro_rules! api_calls {
    ($($name:ident),+ $(,)?) => {
        /// Console API entry points whose usage is counted.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ApiCall {
            $($name),+
        }

        impl ApiCall {
            pub const ALL: &'static [ApiCall] = &[$(ApiCall::$name),+];
            pub const COUNT: usize = Self::ALL.len();

            pub fn name(self) -> &'static str {
                match self {
                    $(ApiCall::$name => stringify!($name)),+
                }
            }
        }
    };
}

api_calls! {
    AddConsoleAlias,
    AllocConsole,
    AttachConsole,
    CreateConsoleScreenBuffer,
    GenerateConsoleCtrlEvent,
    FillConsoleOutputAttribute,
    FillConsoleOutputCharacter,
    FlushConsoleInputBuffer,
    FreeConsole,
    GetConsoleAlias,
    GetConsoleAliases,
    GetConsoleAliasExesLength,
    GetConsoleAliasesLength,
    GetConsoleAliasExes,
    GetConsoleCP,
    GetConsoleCursorInfo,
    GetConsoleDisplayMode,
    GetConsoleFontSize,
    GetConsoleHistoryInfo,
    GetConsoleLangId,
    GetConsoleMode,
    GetConsoleOriginalTitle,
    GetConsoleOutputCP,
    GetConsoleProcessList,
    GetConsoleScreenBufferInfoEx,
    GetConsoleSelectionInfo,
    GetConsoleTitle,
    GetConsoleWindow,
    GetCurrentConsoleFontEx,
    GetLargestConsoleWindowSize,
    GetNumberOfConsoleInputEvents,
    GetNumberOfConsoleMouseButtons,
    PeekConsoleInput,
    ReadConsole,
    ReadConsoleInput,
    ReadConsoleOutput,
    ReadConsoleOutputAttribute,
    ReadConsoleOutputCharacter,
    ScrollConsoleScreenBuffer,
    SetConsoleActiveScreenBuffer,
    SetConsoleCP,
    SetConsoleCursorInfo,
    SetConsoleCursorPosition,
    SetConsoleDisplayMode,
    SetConsoleHistoryInfo,
    SetConsoleMode,
    SetConsoleOutputCP,
    SetConsoleScreenBufferInfoEx,
    SetConsoleScreenBufferSize,
    SetConsoleTextAttribute,
    SetConsoleTitle,
    SetConsoleWindowInfo,
    SetCurrentConsoleFontEx,
    WriteConsole,
    WriteConsoleInput,
    WriteConsoleOutput,
    WriteConsoleOutputAttribute,
    WriteConsoleOutputCharacter,
}

impl ApiCall {
    /// Kinds that also exist as a narrow-character entry point.
    pub fn has_legacy_variant(self) -> bool {
        matches!(
            self,
            ApiCall::AddConsoleAlias
                | ApiCall::FillConsoleOutputCharacter
                | ApiCall::GetConsoleAlias
                | ApiCall::GetConsoleAliases
                | ApiCall::GetConsoleAliasesLength
                | ApiCall::GetConsoleAliasExes
                | ApiCall::GetConsoleAliasExesLength
                | ApiCall::GetConsoleOriginalTitle
                | ApiCall::GetConsoleTitle
                | ApiCall::PeekConsoleInput
                | ApiCall::ReadConsole
                | ApiCall::ReadConsoleInput
                | ApiCall::ReadConsoleOutput
                | ApiCall::ReadConsoleOutputCharacter
                | ApiCall::SetConsoleTitle
                | ApiCall::WriteConsole
                | ApiCall::WriteConsoleInput
                | ApiCall::WriteConsoleOutput
                | ApiCall::WriteConsoleOutputCharacter
        )
    }

    /// Parses the exact variant name, as used in replay scripts.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|api| api.name() == name)
    }
}

/// Per-kind call counts for the default and the legacy call paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCounters {
    default: [u32; ApiCall::COUNT],
    legacy: [u32; ApiCall::COUNT],
}

impl ApiCounters {
    pub fn new() -> Self {
        Self {
            default: [0; ApiCall::COUNT],
            legacy: [0; ApiCall::COUNT],
        }
    }

    pub fn record(&mut self, api: ApiCall, legacy: bool) {
        let bucket = if legacy {
            &mut self.legacy
        } else {
            &mut self.default
        };
        bucket[api as usize] = bucket[api as usize].saturating_add(1);
    }

    pub fn record_default(&mut self, api: ApiCall) {
        self.record(api, false);
    }

    pub fn get(&self, api: ApiCall, legacy: bool) -> u32 {
        if legacy {
            self.legacy[api as usize]
        } else {
            self.default[api as usize]
        }
    }

    pub fn any_legacy(&self) -> bool {
        self.legacy.iter().any(|&n| n > 0)
    }

    /// Every kind with its default-path count, keyed by name.
    pub fn default_report(&self) -> BTreeMap<&'static str, u32> {
        ApiCall::ALL
            .iter()
            .map(|&api| (api.name(), self.default[api as usize]))
            .collect()
    }

    /// Legacy-path counts for kinds that have a legacy variant; `None` when
    /// nothing went through the legacy path.
    pub fn legacy_report(&self) -> Option<BTreeMap<&'static str, u32>> {
        if !self.any_legacy() {
            return None;
        }
        Some(
            ApiCall::ALL
                .iter()
                .filter(|api| api.has_legacy_variant())
                .map(|&api| (api.name(), self.legacy[api as usize]))
                .collect(),
        )
    }
}

impl Default for ApiCounters {
    fn default() -> Self {
        Self::new()
    }
}
