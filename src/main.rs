//! `imgfs <image> <command> [operands...]`: the command-line front end for
//! the filesystem engine.

use std::env;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::exit;

use imgfs::device::BlockDevice;
use imgfs::device::FileDevice;
use imgfs::error::FsError;
use imgfs::format;
use imgfs::ops;
use imgfs::ops::LsResult;

fn usage(prog: &str) -> ! {
    eprintln!(
        "usage: {prog} <image> mkfs <bytes>\n       \
         {prog} <image> mkdir|rmdir|ls|lsdf|rm|du <path>\n       \
         {prog} <image> df\n       \
         {prog} <image> crhl <src> <dst>\n       \
         {prog} <image> ext|red <path> <n>\n       \
         {prog} <image> ecpt <host-file> <vfs-path>\n       \
         {prog} <image> ecpf <vfs-path> <host-file>"
    );
    exit(1);
}

fn fail(prog: &str, msg: impl std::fmt::Display) -> ! {
    eprintln!("{prog}: {msg}");
    exit(1);
}

fn open_image(prog: &str, path: &PathBuf) -> FileDevice {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .unwrap_or_else(|e| fail(prog, format!("{}: {e}", path.display())));
    FileDevice::new(file)
}

fn parse_u64(prog: &str, s: &str) -> u64 {
    s.parse().unwrap_or_else(|_| fail(prog, format!("not a number: {s}")))
}

fn main() {
    let mut args = env::args();
    let prog = args.next().unwrap_or_else(|| "imgfs".to_string());
    let Some(image) = args.next() else {
        usage(&prog);
    };
    let Some(command) = args.next() else {
        usage(&prog);
    };
    let operands: Vec<String> = args.collect();
    let image = PathBuf::from(image);

    if command == "mkfs" {
        let [bytes_str] = operands.as_slice() else {
            usage(&prog);
        };
        let bytes = parse_u64(&prog, bytes_str);
        let file = File::create(&image)
            .unwrap_or_else(|e| fail(&prog, format!("{}: {e}", image.display())));
        file.set_len(bytes)
            .unwrap_or_else(|e| fail(&prog, format!("{}: {e}", image.display())));
        let mut dev = FileDevice::new(file);
        format::mkfs(&mut dev, bytes).unwrap_or_else(|e| fail(&prog, e));
        return;
    }

    let mut dev = open_image(&prog, &image);
    if let Err(e) = run(&mut dev, &prog, &command, &operands) {
        fail(&prog, e);
    }
}

fn run(dev: &mut FileDevice, prog: &str, command: &str, operands: &[String]) -> Result<(), FsError> {
    match (command, operands) {
        ("mkdir", [path]) => ops::mkdir(dev, path),
        ("rmdir", [path]) => ops::rmdir(dev, path),
        ("rm", [path]) => ops::rm(dev, path),
        ("ls", [path]) => print_ls(dev, path),
        ("df", []) => print_df(dev),
        ("lsdf", [path]) => {
            let bytes = ops::lsdf(dev, path)?;
            println!("{bytes}");
            Ok(())
        }
        ("du", [path]) => {
            for (entry_path, bytes) in ops::du(dev, path)? {
                println!("{bytes}\t{entry_path}");
            }
            Ok(())
        }
        ("crhl", [src, dst]) => ops::crhl(dev, src, dst),
        ("ext", [path, n]) => ops::ext(dev, path, parse_operand_u64(prog, n)),
        ("red", [path, n]) => ops::red(dev, path, parse_operand_u64(prog, n)),
        ("ecpt", [host_path, vfs_path]) => {
            let bytes = std::fs::read(host_path).map_err(FsError::from)?;
            ops::ecpt(dev, &bytes, vfs_path)
        }
        ("ecpf", [vfs_path, host_path]) => {
            let bytes = ops::ecpf(dev, vfs_path)?;
            std::fs::write(host_path, bytes).map_err(FsError::from)
        }
        _ => usage(prog),
    }
}

fn parse_operand_u64(prog: &str, s: &str) -> u64 {
    s.parse().unwrap_or_else(|_| fail(prog, format!("not a number: {s}")))
}

fn print_df(dev: &mut impl BlockDevice) -> Result<(), FsError> {
    let report = ops::df(dev)?;
    println!(
        "blocks: {}/{} used, {} free",
        report.used_blocks, report.total_blocks, report.free_blocks
    );
    println!(
        "inodes: {}/{} used, {} free",
        report.used_inodes, report.total_inodes, report.free_inodes
    );
    Ok(())
}

fn print_ls(dev: &mut impl BlockDevice, path: &str) -> Result<(), FsError> {
    match ops::ls(dev, path)? {
        LsResult::File { size } => println!("{size}\t{path}"),
        LsResult::Directory { entries } => {
            for entry in entries {
                let kind = if entry.is_directory { "d" } else { "-" };
                println!("{kind} {}\t{}", entry.size, entry.name);
            }
        }
    }
    Ok(())
}
