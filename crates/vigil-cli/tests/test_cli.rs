//! Integration tests driving the vigil binary end to end.

#[cfg(test)]
mod test_cli {
    use std::path::PathBuf;
    use std::process::Command;

    const BELT_PLANT: &str = "
        plant belt {
            clocks: x;
            initial: stopped;
            final: stopped, moving;
            transition stopped -> moving on move reset x;
            transition moving -> stopped on release when x > 2;
        }
    ";

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("vigil-test-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).expect("failed to write scratch file");
        path
    }

    fn scratch_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("vigil-test-{}-{name}", std::process::id()));
        path
    }

    #[test]
    fn synthesize_writes_an_uppaal_controller() {
        let plant = scratch_file("belt.plant", BELT_PLANT);
        let out = scratch_path("belt.xml");
        let status = Command::new(env!("CARGO_BIN_EXE_vigil"))
            .args(["synthesize", "--plant"])
            .arg(&plant)
            .args([
                "--spec",
                "move D[0,2] !release",
                "--controller-actions",
                "move",
                "--environment-actions",
                "release",
                "--out",
            ])
            .arg(&out)
            .status()
            .expect("failed to run the vigil binary");
        assert_eq!(status.code(), Some(0));

        let xml = std::fs::read_to_string(&out).expect("controller file missing");
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<nta>"));
        assert!(xml.contains("synchronisation\">move!"));

        let _ = std::fs::remove_file(plant);
        let _ = std::fs::remove_file(out);
    }

    #[test]
    fn invalid_specification_exits_with_input_error() {
        let plant = scratch_file("bad-spec.plant", BELT_PLANT);
        let out = scratch_path("bad-spec.xml");
        let status = Command::new(env!("CARGO_BIN_EXE_vigil"))
            .args(["synthesize", "--plant"])
            .arg(&plant)
            .args([
                "--spec",
                "move D[2,1] !release",
                "--controller-actions",
                "move",
                "--environment-actions",
                "release",
                "--out",
            ])
            .arg(&out)
            .status()
            .expect("failed to run the vigil binary");
        assert_eq!(status.code(), Some(2));
        assert!(!out.exists());

        let _ = std::fs::remove_file(plant);
    }

    #[test]
    fn unknown_action_exits_with_input_error() {
        let plant = scratch_file("bad-action.plant", BELT_PLANT);
        let out = scratch_path("bad-action.xml");
        let status = Command::new(env!("CARGO_BIN_EXE_vigil"))
            .args(["synthesize", "--plant"])
            .arg(&plant)
            .args([
                "--spec",
                "F move",
                "--controller-actions",
                "lift",
                "--environment-actions",
                "release",
                "--out",
            ])
            .arg(&out)
            .status()
            .expect("failed to run the vigil binary");
        assert_eq!(status.code(), Some(2));

        let _ = std::fs::remove_file(plant);
    }
}
