// 构建脚本: 启用 ffmpeg 特性时链接FFmpeg依赖库
fn main() {
    // 仅在Windows MSVC环境下添加FFmpeg相关库
    #[cfg(all(feature = "ffmpeg", target_os = "windows", target_env = "msvc"))]
    {
        // Intel QSV (Quick Sync Video) 硬件加速
        println!("cargo:rustc-link-lib=dylib=libmfx");

        // OLE 自动化和VFW (dshow 摄像头)
        println!("cargo:rustc-link-lib=dylib=oleaut32");
        println!("cargo:rustc-link-lib=dylib=vfw32");

        // Secure Channel (TLS/SSL)
        println!("cargo:rustc-link-lib=dylib=secur32");
    }
    println!("cargo:rerun-if-changed=build.rs");
}
