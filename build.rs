fn main() {
    // Generate the plugin's command permissions when the Tauri binding is built
    #[cfg(feature = "tauri")]
    tauri_plugin::Builder::new(&["ask", "transcript", "speak", "execute"]).build();
}
