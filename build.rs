// generate C header when capi feature is enabled

fn main() {
    #[cfg(feature = "capi")]
    {
        generate_c_header();
    }
}

#[cfg(feature = "capi")]
fn generate_c_header() {
    use std::env;
    use std::path::PathBuf;

    let crate_dir = env::var("CARGO_MANIFEST_DIR").unwrap();
    let output_file = PathBuf::from(&crate_dir).join("dhara.h");

    println!("cargo:rerun-if-changed=src/ffi.rs");
    println!("cargo:rerun-if-changed=src/core.rs");

    cbindgen::Builder::new()
        .with_crate(crate_dir)
        .with_language(cbindgen::Language::C)
        .with_include_guard("DHARA_H")
        .with_pragma_once(true)
        .with_documentation(true)
        .with_parse_deps(true)
        .with_parse_include(&["libc"])
        .rename_item("DharaErrorCode", "dhara_error_code_t")
        .rename_item("DharaStream", "dhara_stream_t")
        .with_header(
            "/**\n\
             * Dhara C API\n\
             * \n\
             * Byte streams over files and temp buffers.\n\
             * \n\
             * Basic usage:\n\
             * \n\
             *     dhara_stream_t* body = dhara_stream_from_file(\"/tmp/body.json\", \"r\");\n\
             *     if (!body) {\n\
             *         fprintf(stderr, \"Error: %s\\n\", dhara_last_error());\n\
             *         return 1;\n\
             *     }\n\
             *     \n\
             *     char buffer[1024];\n\
             *     ssize_t n = dhara_read(body, buffer, sizeof(buffer));\n\
             *     \n\
             *     dhara_stream_close(body);\n\
             * \n\
             * Error reporting is per thread (thread-local storage).\n\
             * Stream handles should not be used from multiple threads simultaneously.\n\
             */",
        )
        .with_after_include(
            "#include <stdint.h>\n\
             #include <stddef.h>\n\
             \n\
             #ifdef _WIN32\n\
             typedef intptr_t ssize_t;\n\
             #else\n\
             #include <sys/types.h>\n\
             #endif\n\
             \n\
             #ifdef __cplusplus\n\
             extern \"C\" {\n\
             #endif",
        )
        .with_trailer(
            "#ifdef __cplusplus\n\
             }\n\
             #endif",
        )
        .generate()
        .expect("Unable to generate C bindings")
        .write_to_file(&output_file);

    println!("cargo:warning=Generated C header: {}", output_file.display());
}
