fn main() {
    if let Err(e) = exam_share_lib::run() {
        eprintln!("exam-share: {e}");
        std::process::exit(1);
    }
}
