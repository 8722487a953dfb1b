#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlsplice::{
    append_children_at_path, collect_nodes_at_path, delete_nodes_at_path, FailureMode,
    OperationOptions,
};

// Input layout: path, fragment and document separated by NUL bytes.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let mut parts = s.splitn(3, '\0');
    let (Some(path), Some(fragment), Some(doc)) = (parts.next(), parts.next(), parts.next()) else {
        return;
    };

    let opts = OperationOptions::default().max_result_nodes(100_000);
    let _ = append_children_at_path(doc, path, fragment, &opts);
    let _ = delete_nodes_at_path(doc, path, &opts);
    let _ = collect_nodes_at_path(doc, Some(path), &opts);

    // Soft mode never errors and hands back the input on failure
    let soft = opts.failure_mode(FailureMode::ReturnOriginal);
    let out = delete_nodes_at_path(doc, path, &soft).expect("soft mode returned an error");
    if !out.is_applied() {
        assert_eq!(out.document, doc);
    }
});
