use proc_macro::TokenStream;

fn base_values(input: TokenStream) -> (String, String, String, String) {
    let input_string = input.to_string();
    let mut strings = input_string.split(',');

    let value_ident = strings
        .next()
        .expect("Missing first positional argument: value identifier")
        .trim()
        .replace("\"", "");
    if value_ident.is_empty() {
        panic!("Found empty value identifier.");
    }

    let name = value_ident.replace('_', " ");

    let mut name_chars = name.chars();
    let headline = name_chars.next().unwrap().to_uppercase().chain(name_chars).collect::<String>();

    let tag_name = strings
        .next()
        .expect("Missing second positional argument: tag name string")
        .trim()
        .replace("\"", "");
    if tag_name.is_empty() {
        panic!("Found empty tag name string.");
    }

    if let Some(arg) = strings.next().map(|s| s.trim()) {
        if !arg.is_empty() {
            panic!("Found unexpected third positional argument: {}.", arg);
        }
    }

    (value_ident, name, headline, tag_name)
}

#[proc_macro]
pub fn individual_string_value_accessor(input: TokenStream) -> TokenStream {
    let (value_ident, name, headline, tag_name) = base_values(input);

    format!(
        "
/// ### {0}
impl Mp4Tag {{
    /// Returns the {1} (`{2}`).
    pub fn {3}(&self) -> Option<&str> {{
        self.string_value(\"{2}\")
    }}

    /// Sets the {1} (`{2}`).
    pub fn set_{3}(&mut self, {3}: impl Into<String>) -> crate::Result<()> {{
        self.set_string_value(\"{2}\", &{3}.into())
    }}

    /// Removes the {1} (`{2}`).
    pub fn remove_{3}(&mut self) {{
        self.remove_value(\"{2}\");
    }}
}}
    ",
        headline, name, tag_name, value_ident,
    )
    .parse()
    .expect("Error parsing accessor impl block:")
}

#[proc_macro]
pub fn flag_value_accessor(input: TokenStream) -> TokenStream {
    let (value_ident, name, headline, tag_name) = base_values(input);

    format!(
        "
/// ### {0}
impl Mp4Tag {{
    /// Returns the {1} flag (`{2}`).
    pub fn {3}(&self) -> bool {{
        self.flag_value(\"{2}\")
    }}

    /// Sets the {1} flag to true (`{2}`).
    pub fn set_{3}(&mut self) -> crate::Result<()> {{
        self.set_flag_value(\"{2}\")
    }}

    /// Removes the {1} flag (`{2}`).
    pub fn remove_{3}(&mut self) {{
        self.remove_value(\"{2}\");
    }}
}}
    ",
        headline, name, tag_name, value_ident,
    )
    .parse()
    .expect("Error parsing accessor impl block:")
}

#[proc_macro]
pub fn integer_value_accessor(input: TokenStream) -> TokenStream {
    let (value_ident, name, headline, tag_name) = base_values(input);

    format!(
        "
/// ### {0}
impl Mp4Tag {{
    /// Returns the {1} (`{2}`).
    pub fn {3}(&self) -> Option<u16> {{
        self.u16_value(\"{2}\")
    }}

    /// Sets the {1} (`{2}`).
    pub fn set_{3}(&mut self, {3}: u16) -> crate::Result<()> {{
        self.set_u16_value(\"{2}\", {3})
    }}

    /// Removes the {1} (`{2}`).
    pub fn remove_{3}(&mut self) {{
        self.remove_value(\"{2}\");
    }}
}}
    ",
        headline, name, tag_name, value_ident,
    )
    .parse()
    .expect("Error parsing accessor impl block:")
}
